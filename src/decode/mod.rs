//! The object dispatcher (spec §4.C): resolves GWT class markers to readers and
//! maintains the back-reference cache that lets cyclic object graphs decode.

pub mod readers;
pub mod scanner;

use slog::Logger;

use crate::error::DecodeError;
use crate::wire::stack::StackReader;

pub use readers::DecodedValue;

pub type ReaderFn = fn(&mut Dispatcher) -> Result<DecodedValue, DecodeError>;

/// Registered class readers, resolved by longest-prefix match on the GWT
/// `package.Class/hash` marker the way the upstream client's own `iqd` dispatch
/// does (confirmed against `_read_object` in the retained reference source).
pub struct ClassRegistry {
    entries: Vec<(&'static str, ReaderFn)>,
}

impl ClassRegistry {
    pub fn standard() -> Self {
        ClassRegistry { entries: readers::registry_entries() }
    }

    fn resolve(&self, class_name: &str) -> Option<ReaderFn> {
        self.entries
            .iter()
            .filter(|(prefix, _)| class_name.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, f)| *f)
    }
}

/// A string is a class marker if it has the shape `package.with.dots.Class/1234`.
pub fn is_class_marker(s: &str) -> bool {
    let Some((class_part, hash_part)) = s.split_once('/') else {
        return false;
    };
    if hash_part.contains('/') {
        return false;
    }
    class_part.contains('.') && !hash_part.is_empty() && hash_part.chars().all(|c| c.is_ascii_digit())
}

pub struct Dispatcher<'a> {
    pub reader: StackReader<'a>,
    cache: Vec<Option<DecodedValue>>,
    registry: &'a ClassRegistry,
    logger: Logger,
}

impl<'a> Dispatcher<'a> {
    pub fn new(reader: StackReader<'a>, registry: &'a ClassRegistry, logger: Logger) -> Self {
        Dispatcher { reader, cache: Vec::new(), registry, logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Reads one object off the stack: a back-reference, null, a raw non-marker
    /// value, or a freshly dispatched class instance (§4.C steps 1-8).
    pub fn read_object(&mut self) -> Result<DecodedValue, DecodeError> {
        let raw = self.reader.pop()?;

        if raw < 0 {
            let idx = (-(raw + 1)) as usize;
            return Ok(self.cache.get(idx).and_then(Clone::clone).unwrap_or(DecodedValue::Null));
        }
        if raw == 0 {
            return Ok(DecodedValue::Null);
        }

        if raw as usize > self.reader.strings_len() {
            return Ok(DecodedValue::Null);
        }

        let class_name = match self.reader.resolve_string(raw) {
            Some(s) => s,
            None => return Ok(DecodedValue::Raw(raw)),
        };

        if !is_class_marker(&class_name) {
            return Ok(DecodedValue::Raw(raw));
        }

        // Reserve the cache slot before running the reader so that a field of
        // this very object can reference it (self-referential graphs).
        let slot = self.cache.len();
        self.cache.push(None);

        let value = match self.registry.resolve(&class_name) {
            Some(reader_fn) => reader_fn(self)?,
            None => {
                slog::warn!(self.logger, "no reader registered for class"; "class" => class_name.as_str());
                DecodedValue::Opaque { class_name, unknown: true }
            }
        };

        self.cache[slot] = Some(value.clone());
        Ok(value)
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        Ok(self.reader.read_string()?.unwrap_or_default())
    }

    pub fn read_date(&mut self) -> Result<Option<chrono::NaiveDateTime>, DecodeError> {
        match self.read_object()? {
            DecodedValue::Date(d) => Ok(d),
            _ => Ok(None),
        }
    }
}
