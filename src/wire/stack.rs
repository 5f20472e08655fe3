//! The data-stack reader (spec §4.B): pops values back-to-front the way the
//! wire encodes them, with 1-based string-table indexing.

use serde_json::Value;

use crate::error::DecodeError;

pub fn value_as_i64(v: &Value) -> i64 {
    if let Some(i) = v.as_i64() {
        i
    } else if let Some(f) = v.as_f64() {
        f as i64
    } else {
        0
    }
}

pub struct StackReader<'a> {
    data: &'a [Value],
    strings: &'a [String],
    pos: usize,
}

impl<'a> StackReader<'a> {
    pub fn new(data: &'a [Value], strings: &'a [String]) -> Self {
        StackReader { data, strings, pos: data.len() }
    }

    /// Starts reading as though `pos` values have already been popped — used
    /// by the marker scanner to resume mid-stack without re-reading a marker.
    pub fn at(data: &'a [Value], strings: &'a [String], pos: usize) -> Self {
        StackReader { data, strings, pos }
    }

    pub fn pop_raw(&mut self) -> Result<&'a Value, DecodeError> {
        if self.pos == 0 {
            return Err(DecodeError::Underflow { pos: 0 });
        }
        self.pos -= 1;
        Ok(&self.data[self.pos])
    }

    pub fn pop(&mut self) -> Result<i64, DecodeError> {
        Ok(value_as_i64(self.pop_raw()?))
    }

    pub fn pop_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(self.pop_raw()?.as_f64().unwrap_or(0.0))
    }

    /// GWT encodes booleans as 0/1 integers on the data stack.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.pop()? != 0)
    }

    /// Single pop, not a double pop — an older client revision popped twice
    /// here, silently desyncing every field read after the first string in a
    /// class; that bug is not reproduced.
    pub fn read_string(&mut self) -> Result<Option<String>, DecodeError> {
        let index = self.pop()?;
        Ok(self.resolve_string(index))
    }

    pub fn resolve_string(&self, index: i64) -> Option<String> {
        if index <= 0 {
            return None;
        }
        self.strings.get((index - 1) as usize).cloned()
    }

    pub fn strings_len(&self) -> usize {
        self.strings.len()
    }

    pub fn peek(&self, offset_from_top: usize) -> Option<&'a Value> {
        self.pos.checked_sub(offset_from_top + 1).map(|i| &self.data[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_string_is_a_single_pop() {
        let data = vec![Value::from(1)];
        let strings = vec!["only".to_string()];
        let mut reader = StackReader::new(&data, &strings);
        assert_eq!(reader.read_string().unwrap(), Some("only".to_string()));
        assert!(reader.pop().is_err());
    }

    #[test]
    fn out_of_range_string_index_resolves_to_none() {
        let data = vec![Value::from(99)];
        let strings = vec!["only".to_string()];
        let mut reader = StackReader::new(&data, &strings);
        assert_eq!(reader.read_string().unwrap(), None);
    }

    #[test]
    fn zero_index_is_null_not_an_error() {
        let data = vec![Value::from(0)];
        let strings: Vec<String> = vec![];
        let mut reader = StackReader::new(&data, &strings);
        assert_eq!(reader.read_string().unwrap(), None);
    }

    #[test]
    fn underflow_is_reported() {
        let data: Vec<Value> = vec![];
        let strings: Vec<String> = vec![];
        let mut reader = StackReader::new(&data, &strings);
        assert!(matches!(reader.pop(), Err(DecodeError::Underflow { .. })));
    }
}
