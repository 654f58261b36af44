//! Ordered distinguished name attribute sets
//!
//! Only the attributes used by electronic-signature certificates are modelled:
//! `C, ST, L, O, OU, CN, emailAddress, serialNumber, title`.

use crate::error::{openssl_err, ErrorKind, Result};
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distinguished name attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnAttribute {
    #[serde(rename = "C")]
    Country,
    #[serde(rename = "ST")]
    State,
    #[serde(rename = "L")]
    Locality,
    #[serde(rename = "O")]
    Organization,
    #[serde(rename = "OU")]
    OrganizationalUnit,
    #[serde(rename = "CN")]
    CommonName,
    #[serde(rename = "emailAddress")]
    EmailAddress,
    #[serde(rename = "serialNumber")]
    SerialNumber,
    #[serde(rename = "title")]
    Title,
}

impl DnAttribute {
    /// Order in which attributes are written into a name
    pub const ALL: [DnAttribute; 9] = [
        DnAttribute::Country,
        DnAttribute::State,
        DnAttribute::Locality,
        DnAttribute::Organization,
        DnAttribute::OrganizationalUnit,
        DnAttribute::CommonName,
        DnAttribute::EmailAddress,
        DnAttribute::SerialNumber,
        DnAttribute::Title,
    ];

    pub fn nid(self) -> Nid {
        match self {
            DnAttribute::Country => Nid::COUNTRYNAME,
            DnAttribute::State => Nid::STATEORPROVINCENAME,
            DnAttribute::Locality => Nid::LOCALITYNAME,
            DnAttribute::Organization => Nid::ORGANIZATIONNAME,
            DnAttribute::OrganizationalUnit => Nid::ORGANIZATIONALUNITNAME,
            DnAttribute::CommonName => Nid::COMMONNAME,
            DnAttribute::EmailAddress => Nid::PKCS9_EMAILADDRESS,
            DnAttribute::SerialNumber => Nid::SERIALNUMBER,
            DnAttribute::Title => Nid::TITLE,
        }
    }

    pub fn from_nid(nid: Nid) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.nid() == nid)
    }

    /// OpenSSL short name (`CN`, `emailAddress`, ...)
    pub fn short_name(self) -> &'static str {
        match self {
            DnAttribute::Country => "C",
            DnAttribute::State => "ST",
            DnAttribute::Locality => "L",
            DnAttribute::Organization => "O",
            DnAttribute::OrganizationalUnit => "OU",
            DnAttribute::CommonName => "CN",
            DnAttribute::EmailAddress => "emailAddress",
            DnAttribute::SerialNumber => "serialNumber",
            DnAttribute::Title => "title",
        }
    }
}

impl fmt::Display for DnAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Ordered list of `(attribute, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    entries: Vec<(DnAttribute, String)>,
}

impl DistinguishedName {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, replacing any previous value of `attr`
    pub fn with(mut self, attr: DnAttribute, value: impl Into<String>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn set(&mut self, attr: DnAttribute, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(a, _)| *a == attr) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((attr, value)),
        }
    }

    pub fn remove(&mut self, attr: DnAttribute) -> Option<String> {
        let index = self.entries.iter().position(|(a, _)| *a == attr)?;
        Some(self.entries.remove(index).1)
    }

    /// First value recorded for `attr`
    pub fn get(&self, attr: DnAttribute) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| *a == attr)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (DnAttribute, &str)> {
        self.entries.iter().map(|(a, v)| (*a, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay every attribute of `other` onto `self`
    pub fn merge(mut self, other: &DistinguishedName) -> Self {
        for (attr, value) in other.iter() {
            self.set(attr, value);
        }
        self
    }

    /// Read the known attributes out of an OpenSSL name, skipping the rest
    pub fn from_x509_name(name: &X509NameRef) -> Result<Self> {
        let mut dn = DistinguishedName::new();
        for entry in name.entries() {
            let Some(attr) = DnAttribute::from_nid(entry.object().nid()) else {
                continue;
            };
            let value = entry.data().as_utf8().map_err(openssl_err(
                ErrorKind::Parse,
                format!("Failed to decode {} attribute", attr),
            ))?;
            if dn.get(attr).is_none() {
                dn.entries.push((attr, value.to_string()));
            }
        }
        Ok(dn)
    }

    /// Build an OpenSSL name in [`DnAttribute::ALL`] order, skipping empty values
    pub(crate) fn x509_name(&self) -> std::result::Result<X509Name, ErrorStack> {
        let mut builder = X509Name::builder()?;
        for attr in DnAttribute::ALL {
            if let Some(value) = self.get(attr).filter(|v| !v.is_empty()) {
                builder.append_entry_by_nid(attr.nid(), value)?;
            }
        }
        Ok(builder.build())
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(attr, value)| format!("{}={}", attr, value))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
