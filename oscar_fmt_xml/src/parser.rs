//! Streaming parser turning OpenSCENARIO documents into a checked tree of [`Element`]s.
//!
//! The parser only checks that the document is well-formed
//! and that every tag belongs to the known vocabulary.
//! Interpreting the tree is the job of the builder.

pub(crate) mod expression;
mod vocabulary;

pub use self::expression::{Expr, ExpressionError, parse_expression};
pub use self::vocabulary::*;
use anyhow::{Context, bail};
use log::{error, info, trace};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

/// Errors of documents that cannot be turned into a scenario.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// The element is unknown, or not supported where it appears.
    #[error("unsupported element `{0}`")]
    UnsupportedElement(String),
    /// A required attribute is missing.
    #[error("element `{element}` is missing required attribute `{attribute}`")]
    MissingAttribute {
        /// Tag of the element.
        element: String,
        /// Name of the missing attribute.
        attribute: String,
    },
    /// A required child element is missing.
    #[error("element `{element}` is missing required element `{child}`")]
    MissingElement {
        /// Tag of the parent element.
        element: String,
        /// Tag of the missing child.
        child: String,
    },
    /// An attribute value cannot be read as the expected type.
    #[error("attribute `{attribute}` of `{element}`: cannot read `{value}` as {expected}")]
    TypeMismatch {
        /// Tag of the element.
        element: String,
        /// Name of the attribute.
        attribute: String,
        /// The offending value, after parameter resolution.
        value: String,
        /// Description of the expected type.
        expected: String,
    },
    /// An end tag does not close the last open tag.
    #[error("unexpected end tag `{0}`")]
    UnexpectedEndTag(String),
    /// The document ends with open tags.
    #[error("unclosed tag `{0}`")]
    UnclosedTags(String),
    /// Text, CDATA, processing instructions or DOCTYPE where they are not supported.
    #[error("unsupported content: {0}")]
    UnsupportedContent(String),
    /// A catalog reference points to an entry that cannot be found.
    #[error("catalog `{catalog}` has no entry `{entry}`")]
    CatalogEntryNotFound {
        /// Name of the catalog.
        catalog: String,
        /// Name of the entry.
        entry: String,
    },
    /// An expression cannot be parsed or evaluated.
    #[error("invalid expression `{expression}`: {reason}")]
    Expression {
        /// The expression, as written.
        expression: String,
        /// What went wrong.
        reason: String,
    },
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Name of the tag.
    pub tag: String,
    /// Attributes, in document order, with entities unescaped.
    pub attributes: Vec<(String, String)>,
    /// Child elements, in document order.
    pub children: Vec<Element>,
    /// Text content (only for tags that allow it).
    pub text: String,
    /// Line where the element starts.
    pub line: usize,
}

impl Element {
    /// Raw value of an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The first child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// All children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// The first child with the given tag, which must be present.
    pub fn required(&self, tag: &str) -> Result<&Element, DocumentError> {
        self.child(tag).ok_or_else(|| {
            error!(target: "builder", "element '{}' at line {} is missing '{tag}'", self.tag, self.line);
            DocumentError::MissingElement {
                element: self.tag.clone(),
                child: tag.to_owned(),
            }
        })
    }

    /// The child of an element that contains exactly one of a choice of elements.
    pub fn choice(&self) -> Result<&Element, DocumentError> {
        match self.children.as_slice() {
            [child] => Ok(child),
            [] => {
                error!(target: "builder", "element '{}' at line {} is empty", self.tag, self.line);
                Err(DocumentError::MissingElement {
                    element: self.tag.clone(),
                    child: "any".to_owned(),
                })
            }
            [_, second, ..] => {
                error!(target: "builder", "element '{}' at line {} has more than one choice", self.tag, self.line);
                Err(DocumentError::UnsupportedElement(second.tag.clone()))
            }
        }
    }
}

// Turns byte offsets into line numbers, scanning the text only once.
struct Lines<'a> {
    text: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn at(&mut self, position: u64) -> usize {
        let position = usize::try_from(position)
            .unwrap_or(usize::MAX)
            .min(self.text.len());
        if position > self.offset {
            self.line += self.text[self.offset..position]
                .iter()
                .filter(|b| **b == b'\n')
                .count();
            self.offset = position;
        }
        self.line
    }
}

fn element(
    reader: &Reader<&[u8]>,
    tag: &BytesStart<'_>,
    line: usize,
) -> anyhow::Result<Element> {
    let name = reader.decoder().decode(tag.name().into_inner())?.into_owned();
    if !KNOWN_TAGS.contains(&name.as_str()) {
        error!(target: "parser", "unknown tag '{name}' at line {line}");
        bail!(DocumentError::UnsupportedElement(name));
    }
    let mut attributes = Vec::new();
    for attr in tag.attributes() {
        let attr = attr.with_context(|| format!("malformed attribute in tag '{name}'"))?;
        let key = reader.decoder().decode(attr.key.into_inner())?.into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        tag: name,
        attributes,
        children: Vec::new(),
        text: String::new(),
        line,
    })
}

/// Parses a document into its tree of elements, returning the root element.
pub fn parse(text: &str) -> anyhow::Result<Element> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    let mut lines = Lines::new(text);
    let root = parse_events(&mut reader, &mut lines);
    root.with_context(|| {
        format!(
            "failed to parse document at line {}",
            lines.at(reader.buffer_position())
        )
    })
}

fn parse_events(reader: &mut Reader<&[u8]>, lines: &mut Lines) -> anyhow::Result<Element> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    // Depth of nesting inside an opaque element.
    let mut opaque = 0usize;
    loop {
        let event = reader.read_event().context("failed reading event")?;
        let line = lines.at(reader.buffer_position());
        match event {
            Event::Start(_) | Event::Empty(_) | Event::End(_) | Event::Text(_) if opaque > 0 => {
                match event {
                    Event::Start(_) => opaque += 1,
                    Event::End(tag) => {
                        opaque -= 1;
                        if opaque == 0 {
                            let tag_name = reader
                                .decoder()
                                .decode(tag.name().into_inner())?
                                .into_owned();
                            if !stack.last().is_some_and(|open| open.tag == tag_name) {
                                error!(target: "parser", "unexpected end tag '{tag_name}' closing opaque element");
                                bail!(DocumentError::UnexpectedEndTag(tag_name));
                            }
                            close(&mut stack, &mut root, line)?;
                        }
                    }
                    _ => {}
                }
            }
            Event::Start(tag) => {
                let element = element(reader, &tag, line)?;
                trace!(target: "parser", "start tag '{}'", element.tag);
                if OPAQUE_TAGS.contains(&element.tag.as_str()) {
                    trace!(target: "parser", "skipping content of '{}'", element.tag);
                    opaque = 1;
                }
                stack.push(element);
            }
            Event::End(tag) => {
                let tag_name = reader
                    .decoder()
                    .decode(tag.name().into_inner())?
                    .into_owned();
                if stack.last().is_some_and(|open| open.tag == tag_name) {
                    trace!(target: "parser", "end tag '{tag_name}'");
                    close(&mut stack, &mut root, line)?;
                } else {
                    error!(target: "parser", "unknown or unexpected end tag '{tag_name}'");
                    bail!(DocumentError::UnexpectedEndTag(tag_name));
                }
            }
            Event::Empty(tag) => {
                let element = element(reader, &tag, line)?;
                trace!(target: "parser", "empty tag '{}'", element.tag);
                attach(element, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if !text.trim().is_empty() {
                    match stack.last_mut() {
                        Some(open) if TEXT_TAGS.contains(&open.tag.as_str()) => {
                            open.text.push_str(&text);
                        }
                        _ => {
                            error!(target: "parser", "text content not supported");
                            bail!(DocumentError::UnsupportedContent("text".to_owned()));
                        }
                    }
                }
            }
            // Ignore comments
            Event::Comment(_)
            // Ignore XML declaration
            | Event::Decl(_) => continue,
            Event::CData(_) => {
                error!(target: "parser", "CData not supported");
                bail!(DocumentError::UnsupportedContent("CDATA".to_owned()));
            }
            Event::PI(_) => {
                error!(target: "parser", "Processing Instructions not supported");
                bail!(DocumentError::UnsupportedContent("processing instruction".to_owned()));
            }
            Event::DocType(_) => {
                error!(target: "parser", "DocType not supported");
                bail!(DocumentError::UnsupportedContent("DOCTYPE".to_owned()));
            }
            // exits the loop when reaching end of file
            Event::Eof => {
                info!(target: "parser", "parsing completed");
                break;
            }
        }
    }
    if let Some(open) = stack.pop() {
        error!(target: "parser", "unclosed tag '{}'", open.tag);
        bail!(DocumentError::UnclosedTags(open.tag));
    }
    root.ok_or_else(|| {
        anyhow::Error::new(DocumentError::MissingElement {
            element: "document".to_owned(),
            child: TAG_OPENSCENARIO.to_owned(),
        })
    })
}

// Closes the last open element.
fn close(
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    line: usize,
) -> anyhow::Result<()> {
    let Some(element) = stack.pop() else {
        bail!("no open element to close at line {line}");
    };
    attach(element, stack, root)
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> anyhow::Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        error!(target: "parser", "multiple root elements");
        bail!(DocumentError::UnsupportedContent(format!(
            "second root element `{}`",
            element.tag
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_error(err: &anyhow::Error) -> Option<&DocumentError> {
        err.chain().find_map(|cause| cause.downcast_ref::<DocumentError>())
    }

    #[test]
    fn tree() {
        let root = parse(
            r#"<?xml version="1.0"?>
<!-- comment -->
<OpenSCENARIO>
  <FileHeader author="me" description="a &amp; b"/>
  <Entities>
    <ScenarioObject name="ego"/>
  </Entities>
</OpenSCENARIO>"#,
        )
        .expect("parse");
        assert_eq!(root.tag, TAG_OPENSCENARIO);
        assert_eq!(root.line, 3);
        let header = root.required(TAG_FILE_HEADER).expect("header");
        assert_eq!(header.attribute(ATTR_DESCRIPTION), Some("a & b"));
        assert_eq!(header.attribute(ATTR_NAME), None);
        let entities = root.required(TAG_ENTITIES).expect("entities");
        assert_eq!(entities.line, 5);
        assert_eq!(entities.children_named(TAG_SCENARIO_OBJECT).count(), 1);
        assert!(root.required(TAG_STORYBOARD).is_err());
    }

    #[test]
    fn opaque_content() {
        let root = parse(
            r#"<OpenSCENARIO><RoadNetwork><LogicFile filepath="map.osm"/><Anything>
            <Else/></Anything></RoadNetwork></OpenSCENARIO>"#,
        )
        .expect("parse");
        let road_network = root.required(TAG_ROAD_NETWORK).expect("road network");
        assert!(road_network.children.is_empty());
    }

    #[test]
    fn custom_command_text() {
        let root = parse(
            r#"<UserDefinedAction><CustomCommandAction type="exitFailure">collided</CustomCommandAction></UserDefinedAction>"#,
        )
        .expect("parse");
        assert_eq!(root.children[0].text, "collided");
    }

    #[test]
    fn unknown_tag() {
        let err = parse("<OpenSCENARIO><Foo/></OpenSCENARIO>").expect_err("unknown tag");
        assert_eq!(
            document_error(&err),
            Some(&DocumentError::UnsupportedElement("Foo".to_string()))
        );
    }

    #[test]
    fn malformed() {
        let err = parse("<OpenSCENARIO><Entities></OpenSCENARIO>").expect_err("mismatched");
        assert_eq!(
            document_error(&err),
            Some(&DocumentError::UnexpectedEndTag(TAG_OPENSCENARIO.to_string()))
        );
        let err = parse(r#"<OpenSCENARIO><RoadNetwork><LogicFile filepath="map.osm"/></OpenSCENARIO>"#)
            .expect_err("opaque element closed by its parent");
        assert_eq!(
            document_error(&err),
            Some(&DocumentError::UnexpectedEndTag(TAG_OPENSCENARIO.to_string()))
        );
        let err = parse("<OpenSCENARIO><Entities>").expect_err("unclosed");
        assert_eq!(
            document_error(&err),
            Some(&DocumentError::UnclosedTags(TAG_ENTITIES.to_string()))
        );
        let err = parse("<OpenSCENARIO>text</OpenSCENARIO>").expect_err("text");
        assert!(matches!(
            document_error(&err),
            Some(DocumentError::UnsupportedContent(_))
        ));
        let err = parse("<OpenSCENARIO><![CDATA[x]]></OpenSCENARIO>").expect_err("cdata");
        assert!(matches!(
            document_error(&err),
            Some(DocumentError::UnsupportedContent(_))
        ));
    }
}
