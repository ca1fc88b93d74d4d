//! Groups a batch by resolved space and renders each space's text body.

use std::collections::HashMap;

use tracing::Span;

use crate::template::Template;
use crate::timefmt::TimeFormatter;
use crate::types::{value_to_string, Batch, Event, Payload};

/// Where a record's message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Every record goes to the same space.
    Fixed(String),
    /// The space is rendered per record from its fields.
    Templated(Template),
}

/// Builds per-space payloads from a batch.
///
/// Pure with respect to its inputs: the same batch always produces the same
/// payload sequence, with spaces in first-seen order and each space's lines
/// in batch order.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    destination: Destination,
    message: Template,
    time: TimeFormatter,
    time_key: Option<String>,
    tag_key: Option<String>,
    include_context: bool,
    span: Span,
}

impl PayloadBuilder {
    pub fn new(destination: Destination, message: Template) -> Self {
        Self {
            destination,
            message,
            time: TimeFormatter::default(),
            time_key: Some("time".to_string()),
            tag_key: Some("tag".to_string()),
            include_context: false,
            span: tracing::info_span!("payload_builder"),
        }
    }

    pub fn with_time_formatter(mut self, time: TimeFormatter) -> Self {
        self.time = time;
        self
    }

    /// Names under which the formatted time and the tag are visible to
    /// templates. `None` disables the injection.
    pub fn with_reserved_keys(mut self, time_key: Option<String>, tag_key: Option<String>) -> Self {
        self.time_key = time_key;
        self.tag_key = tag_key;
        self
    }

    /// Prefix every rendered line with `[<tag>] `.
    pub fn with_context(mut self, include_context: bool) -> Self {
        self.include_context = include_context;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn build(&self, batch: &Batch) -> Vec<Payload> {
        let mut payloads: Vec<Payload> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for event in batch.events() {
            let space = self.resolve_space(event);
            let line = self.render_message(event);

            let slot = match index.get(&space) {
                Some(&i) => i,
                None => {
                    index.insert(space.clone(), payloads.len());
                    payloads.push(Payload {
                        space,
                        text: String::new(),
                    });
                    payloads.len() - 1
                }
            };
            let text = &mut payloads[slot].text;
            text.push_str(&line);
            text.push('\n');
        }

        payloads
    }

    pub fn resolve_space(&self, event: &Event) -> String {
        match &self.destination {
            Destination::Fixed(space) => space.clone(),
            Destination::Templated(template) => template.render(|key| self.lookup(event, key)),
        }
    }

    pub fn render_message(&self, event: &Event) -> String {
        let body = self.message.render(|key| self.lookup(event, key));
        if self.include_context {
            format!("[{}] {}", event.tag, body)
        } else {
            body
        }
    }

    fn lookup(&self, event: &Event, key: &str) -> String {
        if self.tag_key.as_deref() == Some(key) {
            return event.tag.clone();
        }
        if self.time_key.as_deref() == Some(key) {
            return self.time.format(event.time);
        }
        match event.record.get(key) {
            Some(value) => value_to_string(value),
            None => {
                tracing::warn!(
                    parent: &self.span,
                    key = %key,
                    tag = %event.tag,
                    record = %serde_json::Value::Object(event.record.clone()),
                    "the specified key not found in record"
                );
                String::new()
            }
        }
    }
}
