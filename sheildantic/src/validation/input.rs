use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Ordered multi-value map holding raw request input.
///
/// Form bodies repeat keys (`tag=a&tag=b`); JSON bodies carry one value per
/// key. Both land here so the pipeline sees a single shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputData {
    entries: IndexMap<String, Vec<Value>>,
}

impl InputData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        pairs.into_iter().collect()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.append(key, value);
        self
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(|values| values.first())
    }

    pub fn get_all(&self, key: &str) -> &[Value] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value reported back in error details: the single value, or all of
    /// them as an array when the key was repeated.
    pub fn raw_value(&self, key: &str) -> Option<Value> {
        match self.get_all(key) {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(Value::Array(many.to_vec())),
        }
    }
}

impl From<Map<String, Value>> for InputData {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for InputData
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = InputData::new();
        data.extend(iter);
        data
    }
}

impl<K, V> Extend<(K, V)> for InputData
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key, value);
        }
    }
}
