use std::collections::HashMap;

use serde::de::value::{Error as ParamsError, MapDeserializer};
use serde::de::DeserializeOwned;

/// Values captured by `{name}` segments of the matched route template.
#[derive(Clone, Debug, Default)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Deserialize the captures into `T`, field by field. Every value is a string, so
    /// numeric fields are rejected rather than parsed.
    pub fn deserialize<T>(&self) -> Result<T, ParamsError>
    where
        T: DeserializeOwned,
    {
        let captures = self
            .0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()));
        T::deserialize(MapDeserializer::<_, ParamsError>::new(captures))
    }
}

impl<K, V> FromIterator<(K, V)> for PathParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PathParams(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}
