use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const CREATED_NAME: &str = "Oleh";
pub const UPDATED_NAME: &str = "Anzhella";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }
}

/// Crocodile record as returned by the resource API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crocodile {
    pub id: u64,
    pub name: String,
    pub sex: Sex,
    pub date_of_birth: NaiveDate,
}

/// Body for create (POST) and full replace (PUT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCrocodile {
    pub name: String,
    pub sex: Sex,
    pub date_of_birth: NaiveDate,
}

impl NewCrocodile {
    fn sample_date_of_birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 5, 15).unwrap_or_default()
    }

    /// Payload sent by the create step.
    pub fn sample() -> Self {
        Self {
            name: CREATED_NAME.to_string(),
            sex: Sex::Male,
            date_of_birth: Self::sample_date_of_birth(),
        }
    }

    /// Payload sent by the full update step.
    pub fn renamed_sample() -> Self {
        Self {
            name: UPDATED_NAME.to_string(),
            ..Self::sample()
        }
    }

    pub fn into_record(self, id: u64) -> Crocodile {
        Crocodile {
            id,
            name: self.name,
            sex: self.sex,
            date_of_birth: self.date_of_birth,
        }
    }
}

/// Body for partial update (PATCH). Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrocodilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl CrocodilePatch {
    pub fn sex(sex: Sex) -> Self {
        Self {
            sex: Some(sex),
            ..Self::default()
        }
    }

    pub fn apply(&self, record: &mut Crocodile) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(sex) = self.sex {
            record.sex = sex;
        }
        if let Some(date_of_birth) = self.date_of_birth {
            record.date_of_birth = date_of_birth;
        }
    }
}

/// Identifier assigned by the API on create; the only value threaded
/// between steps of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u64);

impl ResourceId {
    pub fn from_body(body: &Value) -> Option<Self> {
        body.get("id").and_then(Value::as_u64).map(ResourceId)
    }

    pub fn matches(&self, body: &Value) -> bool {
        Self::from_body(body) == Some(*self)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
