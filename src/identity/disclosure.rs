//! Selective disclosure: checking whether an identity can satisfy a set of
//! requirements, and cutting the identity down to exactly what was asked for.
//!
//! There are two tiers of output. An [`IdentityProjection`] is for trusted,
//! local callers and carries the identity's hash, public key, name, and KYC
//! flag alongside the requested fields. A [`Disclosure`] is what actually
//! goes out to an application and carries *only* the requested fields. The
//! private key is never part of either.

use crate::{
    identity::{
        fields::{LocationField, PersonalField},
        identity::Identity,
        info::{Location, LocationValue},
        requirements::RequirementSet,
    },
};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Requested personal fields and their values
pub type PersonalDisclosure = BTreeMap<PersonalField, String>;
/// Requested location fields and their values
pub type LocationDisclosure = BTreeMap<LocationField, LocationValue>;

/// An identity trimmed down to the fields a requirement set asked for, plus
/// the identifying bits we show locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
#[serde(rename_all = "camelCase")]
pub struct IdentityProjection {
    hash: String,
    public_key: String,
    name: String,
    kyc: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    personal: Option<PersonalDisclosure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<LocationDisclosure>,
}

impl IdentityProjection {
    /// Drop everything that identifies the identity itself, leaving only the
    /// requested fields.
    pub fn into_disclosure(self) -> Disclosure {
        Disclosure {
            personal: self.personal,
            location: self.location,
        }
    }
}

/// What we hand to an outside application: requested fields and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Disclosure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    personal: Option<PersonalDisclosure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<LocationDisclosure>,
}

impl Identity {
    /// Whether this identity can satisfy the given requirements. Every personal
    /// field must be set, and every location field must be set *on the same
    /// location*.
    pub fn has_requirements(&self, requirements: &RequirementSet) -> bool {
        let personal = requirements.personal().iter().all(|f| self.personal().has_value(*f));
        let location = requirements.location().is_empty()
            || self.locations().iter().any(|l| l.has_fields(requirements.location()));
        personal && location
    }

    /// Like [`Identity::has_requirements`], but takes the raw request. A
    /// malformed request is never satisfied.
    pub fn has_required_fields(&self, request: &Value) -> bool {
        match RequirementSet::from_request(request) {
            Ok(requirements) => self.has_requirements(&requirements),
            Err(err) => {
                tracing::debug!(error = %err, "rejecting malformed requirements");
                false
            }
        }
    }

    /// Project this identity down to the given requirements. Location fields
    /// come from `location`, or the default location if none is given.
    pub fn project(&self, requirements: &RequirementSet, location: Option<&Location>) -> IdentityProjection {
        let personal = if requirements.personal().is_empty() {
            None
        } else {
            Some(
                requirements.personal().iter()
                    .map(|f| (*f, self.personal().get(*f).to_string()))
                    .collect::<PersonalDisclosure>()
            )
        };
        let location_disclosure = if requirements.location().is_empty() {
            None
        } else {
            let source = location.unwrap_or_else(|| self.default_location());
            Some(
                requirements.location().iter()
                    .map(|f| (*f, source.value(*f).clone()))
                    .collect::<LocationDisclosure>()
            )
        };
        IdentityProjection {
            hash: self.hash().clone(),
            public_key: self.public_key().clone(),
            name: self.name().clone(),
            kyc: *self.kyc(),
            personal,
            location: location_disclosure,
        }
    }

    /// Project this identity against a raw request, for local use. Returns
    /// `None` if the request is malformed.
    pub fn as_only_required_fields(&self, request: &Value, location: Option<&Location>) -> Option<IdentityProjection> {
        let requirements = RequirementSet::from_request(request).ok()?;
        Some(self.project(&requirements, location))
    }

    /// Build the disclosure we send to an outside application. Returns `None`
    /// if the request is malformed.
    pub fn as_returned_fields(&self, request: &Value, location: Option<&Location>) -> Option<Disclosure> {
        self.as_only_required_fields(request, location)
            .map(|projection| projection.into_disclosure())
    }

    /// Look up a value by name. Identity attributes win, then personal fields,
    /// then fields on `location` (or the default location). Structured
    /// location values resolve to their `name`. The private key can't be
    /// looked up this way.
    pub fn property_value(&self, name: &str, location: Option<&Location>) -> Option<Value> {
        let top = match name {
            "hash" => Some(Value::from(self.hash().as_str())),
            "publicKey" => Some(Value::from(self.public_key().as_str())),
            "name" => Some(Value::from(self.name().as_str())),
            "kyc" => Some(Value::from(*self.kyc())),
            "ridl" => Some(Value::from(*self.ridl())),
            _ => None,
        };
        if top.is_some() {
            return top;
        }
        if let Ok(field) = PersonalField::from_str(name) {
            return Some(Value::from(self.personal().get(field)));
        }
        if let Ok(field) = LocationField::from_str(name) {
            let source = location.unwrap_or_else(|| self.default_location());
            return Some(source.value(field).display_value());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test::setup_identity;
    use serde_json::json;

    #[test]
    fn disclosure_email_scenario() {
        let identity = setup_identity();
        assert!(identity.has_required_fields(&json!({"personal": ["email"]})));
        assert!(!identity.has_required_fields(&json!({"personal": ["firstname"]})));
        assert!(!identity.has_required_fields(&json!({"personal": ["email"], "nope": 1})));
        assert!(!identity.has_required_fields(&json!({"personal": ["shoesize"]})));
        assert!(identity.has_required_fields(&json!({})));
    }

    #[test]
    fn disclosure_location_fields_must_share_a_location() {
        let identity = setup_identity();
        // home has a city, work has a phone. nobody has both.
        assert!(identity.has_required_fields(&json!({"location": ["city"]})));
        assert!(identity.has_required_fields(&json!({"location": ["phone"]})));
        assert!(!identity.has_required_fields(&json!({"location": ["phone", "city"]})));
        assert!(identity.has_required_fields(&json!({"location": ["phone", "country"]})));
    }

    #[test]
    fn disclosure_projection_contents() {
        let identity = setup_identity();
        let projection = identity.as_only_required_fields(&json!({"personal": ["email"], "location": ["phone", "country"]}), None).unwrap();
        assert_eq!(projection.hash(), "a1b2c3");
        assert_eq!(projection.name(), "butch");
        assert_eq!(projection.public_key(), identity.public_key());
        assert_eq!(projection.personal().as_ref().unwrap().get(&PersonalField::Email).unwrap(), "a@b.com");
        assert_eq!(projection.personal().as_ref().unwrap().len(), 1);
        // default location is "work"
        let location = projection.location().as_ref().unwrap();
        assert_eq!(location.get(&LocationField::Phone), Some(&LocationValue::from("555-1234")));
        assert_eq!(location.len(), 2);

        let ser = serde_json::to_value(&projection).unwrap();
        assert!(ser.get("privateKey").is_none());
        assert!(ser.get("locations").is_none());
        assert!(ser.get("ridl").is_none());
        assert_eq!(ser["location"]["country"]["code"], json!("US"));

        let nothing = identity.as_only_required_fields(&json!({"accounts": []}), None).unwrap();
        let ser = serde_json::to_value(&nothing).unwrap();
        assert!(ser.get("personal").is_none());
        assert!(ser.get("location").is_none());
        assert_eq!(ser["hash"], json!("a1b2c3"));

        assert!(identity.as_only_required_fields(&json!({"personal": ["shoesize"]}), None).is_none());
    }

    #[test]
    fn disclosure_chosen_location() {
        let identity = setup_identity();
        let home = &identity.locations()[0];
        let projection = identity.as_only_required_fields(&json!({"location": ["city", "phone"]}), Some(home)).unwrap();
        let location = projection.location().as_ref().unwrap();
        assert_eq!(location.get(&LocationField::City), Some(&LocationValue::from("Kalamazoo")));
        assert_eq!(location.get(&LocationField::Phone), Some(&LocationValue::from("")));
    }

    #[test]
    fn disclosure_external_strips_identifiers() {
        let identity = setup_identity();
        let requests = vec![
            json!({"personal": ["email"], "location": ["country"]}),
            json!({"personal": ["firstname", "lastname", "email", "birthdate"]}),
            json!({"location": ["phone", "address", "city", "state", "country", "zipcode"]}),
            json!({}),
        ];
        for req in requests {
            let disclosure = identity.as_returned_fields(&req, None).unwrap();
            let ser = serde_json::to_value(&disclosure).unwrap();
            for key in ["hash", "name", "publicKey", "kyc", "ridl", "privateKey"] {
                assert!(ser.get(key).is_none(), "{} leaked", key);
            }
            let ser_str = ser.to_string();
            assert!(!ser_str.contains(identity.public_key().as_str()));
        }
        let disclosure = identity.as_returned_fields(&json!({"personal": ["email"]}), None).unwrap();
        assert_eq!(serde_json::to_value(&disclosure).unwrap(), json!({"personal": {"email": "a@b.com"}}));
        assert!(identity.as_returned_fields(&json!({"extra": []}), None).is_none());
    }

    #[test]
    fn disclosure_property_value() {
        let identity = setup_identity();
        assert_eq!(identity.property_value("name", None), Some(json!("butch")));
        assert_eq!(identity.property_value("hash", None), Some(json!("a1b2c3")));
        assert_eq!(identity.property_value("ridl", None), Some(json!(-1)));
        assert_eq!(identity.property_value("email", None), Some(json!("a@b.com")));
        assert_eq!(identity.property_value("country", None), Some(json!("United States")));
        assert_eq!(identity.property_value("phone", None), Some(json!("555-1234")));
        let home = &identity.locations()[0];
        assert_eq!(identity.property_value("city", Some(home)), Some(json!("Kalamazoo")));
        assert_eq!(identity.property_value("city", None), Some(json!("")));
        assert_eq!(identity.property_value("privateKey", None), None);
        assert_eq!(identity.property_value("shoesize", None), None);
    }
}
