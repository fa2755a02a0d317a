
pub mod client;
pub mod error;
pub mod experiment;
pub mod id;
pub mod limits;
pub mod run;
pub mod search;

// The server sends int64 fields either as numbers or as decimal strings.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum IntOrStr {
    Int(i64),
    Str(String),
}

impl IntOrStr {
    fn parse<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            IntOrStr::Int(int) => Ok(int),
            IntOrStr::Str(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

// deserialize i64 from number or str
mod int64 {
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    use super::IntOrStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        IntOrStr::deserialize(deserializer)?.parse()
    }

    pub fn serialize<S>(int: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        int.serialize(serializer)
    }
}

// deserialize Option<i64> from Option<number or str>
mod opt_int64 {
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    use super::IntOrStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<IntOrStr>::deserialize(deserializer)? {
            Some(value) => Ok(Some(value.parse()?)),
            None => Ok(None),
        }
    }

    pub fn serialize<S>(int: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        int.serialize(serializer)
    }
}
