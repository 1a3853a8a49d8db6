//! The field catalog: the closed sets of field names an application is allowed
//! to ask for. Anything outside these sets is rejected outright.

use crate::error::{Error, Result};
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// Defines a closed set of disclosable field names, with string conversions
/// in both directions and an `ALL` listing in catalog order.
macro_rules! field_catalog {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $str:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every field in this category.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// The wire name of this field.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $str => Ok(Self::$variant), )+
                    _ => Err(Error::RequirementsUnknownField(s.into())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    }
}

field_catalog! {
    /// Fields that live in an identity's personal information.
    PersonalField {
        Firstname => "firstname",
        Lastname => "lastname",
        Email => "email",
        Birthdate => "birthdate",
    }
}

field_catalog! {
    /// Fields that live on a location record.
    LocationField {
        Phone => "phone",
        Address => "address",
        City => "city",
        State => "state",
        /// May hold a structured value (from a country picker) instead of text.
        Country => "country",
        Zipcode => "zipcode",
    }
}

field_catalog! {
    /// Fields every account descriptor must carry.
    AccountField {
        Blockchain => "blockchain",
        Network => "network",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_from_str() {
        assert_eq!("email".parse::<PersonalField>().unwrap(), PersonalField::Email);
        assert_eq!("zipcode".parse::<LocationField>().unwrap(), LocationField::Zipcode);
        assert_eq!("network".parse::<AccountField>().unwrap(), AccountField::Network);
        assert_eq!("Email".parse::<PersonalField>().err(), Some(Error::RequirementsUnknownField("Email".into())));
        // location fields aren't personal fields
        assert_eq!("phone".parse::<PersonalField>().err(), Some(Error::RequirementsUnknownField("phone".into())));
    }

    #[test]
    fn catalog_is_closed() {
        assert_eq!(PersonalField::ALL.len(), 4);
        assert_eq!(LocationField::ALL.len(), 6);
        assert_eq!(AccountField::ALL.len(), 2);
        for field in LocationField::ALL {
            assert_eq!(&field.to_string().parse::<LocationField>().unwrap(), field);
        }
    }

    #[test]
    fn catalog_serde() {
        let ser = serde_json::to_string(&vec![PersonalField::Firstname, PersonalField::Birthdate]).unwrap();
        assert_eq!(ser, r#"["firstname","birthdate"]"#);
        let de: Vec<LocationField> = serde_json::from_str(r#"["country","state"]"#).unwrap();
        assert_eq!(de, vec![LocationField::Country, LocationField::State]);
        assert!(serde_json::from_str::<Vec<LocationField>>(r#"["planet"]"#).is_err());
    }
}
