use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a remote directory ("menu") that receives uploaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuId(pub i64);

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MenuId {
    fn from(id: i64) -> Self {
        MenuId(id)
    }
}

/// Renders an optional directory id the way the server expects it in a
/// form field: the number, or the empty string for the root.
pub fn menu_id_field(id: Option<MenuId>) -> String {
    id.map(|m| m.to_string()).unwrap_or_default()
}

/// Serde adapter for `Option<MenuId>`: `None` is written as `""`, and both
/// numbers and numeric strings are accepted when reading.
pub(crate) mod optional_menu_id {
    use serde::de::{self, Deserializer, Visitor};
    use serde::{Serialize, Serializer};
    use std::fmt;

    use super::MenuId;

    pub fn serialize<S: Serializer>(id: &Option<MenuId>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(m) => m.0.serialize(serializer),
            None => "".serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<MenuId>, D::Error> {
        struct MenuIdVisitor;

        impl Visitor<'_> for MenuIdVisitor {
            type Value = Option<MenuId>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a directory id, a numeric string or an empty string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Some(MenuId(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(|v| Some(MenuId(v)))
                    .map_err(|_| E::custom("directory id out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.is_empty() {
                    return Ok(None);
                }
                v.parse::<i64>().map(|v| Some(MenuId(v))).map_err(E::custom)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(MenuIdVisitor)
    }
}
