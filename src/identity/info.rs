//! Personal information and locations: the actual data an identity can
//! disclose.

use crate::{
    error::{Error, Result},
    identity::fields::{LocationField, PersonalField},
};
use rand::{CryptoRng, Rng, RngCore};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Deref;

/// Name given to locations that haven't been named by the user.
pub const DEFAULT_LOCATION_NAME: &str = "Unnamed Location";

/// Personal information. An empty string means the field is not set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInformation {
    firstname: String,
    lastname: String,
    email: String,
    birthdate: String,
}

impl PersonalInformation {
    /// Get a personal field's value.
    pub fn get(&self, field: PersonalField) -> &str {
        match field {
            PersonalField::Firstname => &self.firstname,
            PersonalField::Lastname => &self.lastname,
            PersonalField::Email => &self.email,
            PersonalField::Birthdate => &self.birthdate,
        }
    }

    /// Set a personal field's value.
    pub fn set<T: Into<String>>(&mut self, field: PersonalField, value: T) {
        let slot = match field {
            PersonalField::Firstname => &mut self.firstname,
            PersonalField::Lastname => &mut self.lastname,
            PersonalField::Email => &mut self.email,
            PersonalField::Birthdate => &mut self.birthdate,
        };
        *slot = value.into();
    }

    /// Whether the given field has a (non-empty) value.
    pub fn has_value(&self, field: PersonalField) -> bool {
        !self.get(field).is_empty()
    }

    /// Returns the subset of `fields` that have a value here.
    pub fn find_fields(&self, fields: &[PersonalField]) -> Vec<PersonalField> {
        fields.iter().copied().filter(|f| self.has_value(*f)).collect()
    }

    /// True if none of the fields are set.
    pub fn is_empty(&self) -> bool {
        self.find_fields(PersonalField::ALL).is_empty()
    }
}

/// A value on a location. Most are text, but country can come in as an object
/// (`{"name": "United States", "code": "US"}`) from a country picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationValue {
    Text(String),
    Structured(Map<String, Value>),
}

impl Default for LocationValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for LocationValue {
    fn from(val: &str) -> Self {
        Self::Text(val.into())
    }
}

impl From<String> for LocationValue {
    fn from(val: String) -> Self {
        Self::Text(val)
    }
}

impl LocationValue {
    /// The value we show for this location value. Structured values unwrap to
    /// their `name` if they have one.
    pub fn display_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Structured(obj) => {
                obj.get("name").cloned().unwrap_or_else(|| Value::Object(obj.clone()))
            }
        }
    }
}

/// A location (home, work, etc).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters, getset::MutGetters, getset::Setters)]
#[getset(get = "pub", get_mut = "pub", set = "pub")]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Numeric id, unique within an identity
    id: u64,
    /// What the user calls this location
    #[serde(default = "default_location_name")]
    name: String,
    /// Is this the location we disclose when none is picked?
    #[serde(default)]
    is_default: bool,
    #[getset(skip)]
    #[serde(default)]
    phone: LocationValue,
    #[getset(skip)]
    #[serde(default)]
    address: LocationValue,
    #[getset(skip)]
    #[serde(default)]
    city: LocationValue,
    #[getset(skip)]
    #[serde(default)]
    state: LocationValue,
    #[getset(skip)]
    #[serde(default)]
    country: LocationValue,
    #[getset(skip)]
    #[serde(default)]
    zipcode: LocationValue,
}

fn default_location_name() -> String {
    String::from(DEFAULT_LOCATION_NAME)
}

impl Location {
    /// Create a new, empty location with a fresh 10-digit id.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            id: rng.gen_range(1_000_000_000u64..10_000_000_000u64),
            name: default_location_name(),
            is_default: false,
            phone: Default::default(),
            address: Default::default(),
            city: Default::default(),
            state: Default::default(),
            country: Default::default(),
            zipcode: Default::default(),
        }
    }

    /// Get a location field's value.
    pub fn value(&self, field: LocationField) -> &LocationValue {
        match field {
            LocationField::Phone => &self.phone,
            LocationField::Address => &self.address,
            LocationField::City => &self.city,
            LocationField::State => &self.state,
            LocationField::Country => &self.country,
            LocationField::Zipcode => &self.zipcode,
        }
    }

    /// Set a location field's value.
    pub fn set_value(&mut self, field: LocationField, value: LocationValue) {
        let slot = match field {
            LocationField::Phone => &mut self.phone,
            LocationField::Address => &mut self.address,
            LocationField::City => &mut self.city,
            LocationField::State => &mut self.state,
            LocationField::Country => &mut self.country,
            LocationField::Zipcode => &mut self.zipcode,
        };
        *slot = value;
    }

    /// Whether a field has a value. Country only counts once it's been set
    /// from a picker (ie, structured); everything else needs non-empty text.
    pub fn has_value(&self, field: LocationField) -> bool {
        match (field, self.value(field)) {
            (LocationField::Country, val) => !matches!(val, LocationValue::Text(_)),
            (_, LocationValue::Text(text)) => !text.is_empty(),
            (_, LocationValue::Structured(_)) => true,
        }
    }

    /// Returns the subset of `fields` that have a value on this location.
    pub fn find_fields(&self, fields: &[LocationField]) -> Vec<LocationField> {
        fields.iter().copied().filter(|f| self.has_value(*f)).collect()
    }

    /// Whether every one of `fields` has a value on this location.
    pub fn has_fields(&self, fields: &[LocationField]) -> bool {
        fields.iter().all(|f| self.has_value(*f))
    }
}

/// An ordered list of locations that is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Location>")]
pub struct Locations(Vec<Location>);

impl Locations {
    /// Start a location list.
    pub fn new(first: Location) -> Self {
        Self(vec![first])
    }

    /// The first location flagged as default, or the first location if none
    /// are flagged.
    pub fn default_location(&self) -> &Location {
        self.0.iter()
            .find(|l| *l.is_default())
            .unwrap_or(&self.0[0])
    }

    /// Grab a location by id.
    pub fn get(&self, id: u64) -> Option<&Location> {
        self.0.iter().find(|l| l.id() == &id)
    }

    /// Grab a mutable location by id.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Location> {
        self.0.iter_mut().find(|l| l.id() == &id)
    }

    /// The first location. There always is one.
    pub fn first_mut(&mut self) -> &mut Location {
        &mut self.0[0]
    }

    /// Add a location to the end of the list.
    pub fn push(&mut self, location: Location) {
        self.0.push(location);
    }

    /// Remove a location. The last location can't be removed.
    pub fn remove(&mut self, id: u64) -> Result<Location> {
        let idx = self.0.iter().position(|l| l.id() == &id)
            .ok_or(Error::IdentityLocationNotFound)?;
        if self.0.len() == 1 {
            Err(Error::IdentityLocationsEmpty)?;
        }
        Ok(self.0.remove(idx))
    }

    /// Make the given location the default (and only the given location).
    pub fn set_default(&mut self, id: u64) -> Result<()> {
        if self.get(id).is_none() {
            Err(Error::IdentityLocationNotFound)?;
        }
        for loc in self.0.iter_mut() {
            let is_it = loc.id() == &id;
            loc.set_is_default(is_it);
        }
        Ok(())
    }
}

impl Deref for Locations {
    type Target = [Location];
    fn deref(&self) -> &Self::Target {
        &self.0[..]
    }
}

impl TryFrom<Vec<Location>> for Locations {
    type Error = Error;

    fn try_from(locations: Vec<Location>) -> std::result::Result<Self, Self::Error> {
        if locations.is_empty() {
            Err(Error::IdentityLocationsEmpty)?;
        }
        Ok(Self(locations))
    }
}
