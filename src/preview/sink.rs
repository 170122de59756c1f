//! html5ever `TreeSink` that builds a [`RenderedDocument`].

use super::dom::{Attribute, NodeData, NodeId, RenderedDocument};
use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName};
use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

/// Handle the tree builder holds on to.
///
/// Element handles carry their own copy of the element name so `elem_name`
/// can hand out a reference without reaching into the `RefCell`.
#[derive(Debug, Clone)]
pub(super) struct SinkHandle {
    id: NodeId,
    name: Option<Rc<QualName>>,
}

/// Builds a `RenderedDocument` while html5ever parses.
///
/// html5ever's `TreeSink` takes `&self` everywhere, hence the `RefCell`.
pub(super) struct DocumentSink {
    doc: RefCell<RenderedDocument>,
}

impl DocumentSink {
    pub(super) fn new() -> Self {
        Self {
            doc: RefCell::new(RenderedDocument::bare()),
        }
    }

    pub(super) fn into_document(self) -> RenderedDocument {
        self.doc.into_inner()
    }

    fn handle(id: NodeId) -> SinkHandle {
        SinkHandle { id, name: None }
    }

    fn convert_attrs(attrs: Vec<Html5Attribute>) -> Vec<Attribute> {
        attrs
            .into_iter()
            .map(|a| Attribute {
                name: a.name,
                value: a.value.to_string(),
            })
            .collect()
    }

    fn append_to(doc: &mut RenderedDocument, parent: NodeId, child: NodeOrText<SinkHandle>) {
        match child {
            NodeOrText::AppendNode(node) => doc.append(parent, node.id),
            NodeOrText::AppendText(text) => doc.append_text(parent, &text),
        }
    }
}

impl TreeSink for DocumentSink {
    type Handle = SinkHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {}

    fn get_document(&self) -> Self::Handle {
        Self::handle(self.doc.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        static NO_NAME: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };
        target.name.as_deref().unwrap_or(&NO_NAME)
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let id = self.doc.borrow_mut().push(NodeData::Element {
            name: name.clone(),
            attrs: Self::convert_attrs(attrs),
        });
        SinkHandle {
            id,
            name: Some(Rc::new(name)),
        }
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        let id = self
            .doc
            .borrow_mut()
            .push(NodeData::Comment(text.to_string()));
        Self::handle(id)
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        let id = self.doc.borrow_mut().push(NodeData::Comment(String::new()));
        Self::handle(id)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        Self::append_to(&mut self.doc.borrow_mut(), parent.id, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let mut doc = self.doc.borrow_mut();
        if doc.parent(element.id).is_some() {
            match child {
                NodeOrText::AppendNode(node) => doc.insert_before(element.id, node.id),
                NodeOrText::AppendText(text) => doc.insert_text_before(element.id, &text),
            }
        } else {
            Self::append_to(&mut doc, prev_element.id, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // Fragments are serialized without a doctype.
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut doc = self.doc.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => doc.insert_before(sibling.id, node.id),
            NodeOrText::AppendText(text) => doc.insert_text_before(sibling.id, &text),
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        let mut doc = self.doc.borrow_mut();
        for attr in attrs {
            if !doc.has_attr(target.id, &attr.name.local) {
                doc.set_attr(target.id, &attr.name.local, &attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.doc.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut doc = self.doc.borrow_mut();
        let children: Vec<NodeId> = doc.children(node.id).collect();
        for child in children {
            doc.append(new_parent.id, child);
        }
    }
}
