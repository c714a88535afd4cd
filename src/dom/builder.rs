/// A subtree waiting to be inserted into a [`Document`](super::Document).
///
/// Hosts describe whole inserted subtrees with these; a single
/// [`Document::append`](super::Document::append) produces a single mutation
/// record no matter how deep the subtree is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSpec {
    Element(ElementSpec),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<NodeSpec>,
}

pub fn element(tag: &str) -> ElementSpec {
    ElementSpec {
        tag: tag.to_ascii_lowercase(),
        attributes: Vec::new(),
        children: Vec::new(),
    }
}

pub fn text(content: impl Into<String>) -> NodeSpec {
    NodeSpec::Text(content.into())
}

impl ElementSpec {
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Adds one or more space separated classes to the `class` attribute.
    pub fn class(mut self, class: &str) -> Self {
        match self.attributes.iter_mut().find(|(name, _)| name == "class") {
            Some((_, value)) => {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(class);
            }
            None => self.attributes.push(("class".into(), class.into())),
        }
        self
    }

    /// Sets an attribute, replacing any previous value.
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = value.into(),
            None => self.attributes.push((name, value.into())),
        }
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.children.push(NodeSpec::Text(content.into()));
        self
    }

    pub fn child(mut self, child: impl Into<NodeSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<NodeSpec>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

impl From<ElementSpec> for NodeSpec {
    fn from(spec: ElementSpec) -> Self {
        NodeSpec::Element(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_calls_accumulate() {
        let spec = element("DIV").class("modal-container").class("mod-dim");
        assert_eq!(spec.tag, "div");
        assert_eq!(
            spec.attributes,
            vec![("class".to_string(), "modal-container mod-dim".to_string())]
        );
    }

    #[test]
    fn attr_replaces_existing_value() {
        let spec = element("div").attr("tabindex", "0").attr("TABINDEX", "-1");
        assert_eq!(spec.attributes, vec![("tabindex".to_string(), "-1".to_string())]);
    }
}
