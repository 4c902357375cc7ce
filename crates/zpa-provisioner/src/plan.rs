use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One attribute of a plan or state snapshot.
///
/// `Unknown` is a value the engine will only learn after apply (computed
/// fields); `Null` is explicitly unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr<T> {
    Unknown,
    Null,
    Known(T),
}

impl<T> Default for Attr<T> {
    fn default() -> Self {
        Self::Null
    }
}

impl<T> Attr<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Keep a known value; otherwise take `fallback` (if any).
    pub fn or_known(self, fallback: Option<T>) -> Self {
        match self {
            Self::Known(v) => Self::Known(v),
            other => fallback.map_or(other, Self::Known),
        }
    }
}

impl Attr<String> {
    /// The known value, trimmed. Blank strings count as unset.
    pub fn trimmed(&self) -> Option<&str> {
        self.known().map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }
}

// Unknown only exists inside a plan; persisted state never carries it.
impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => serializer.serialize_some(v),
            Self::Unknown | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
