//! Field extraction from registry records.
//!
//! A [`RegistryRecord`] is one element of the registry export array
//! (Brønnøysund `enheter` format). Every field is optional at the JSON
//! level; [`extract_row`] is total and normalizes anything missing to an
//! empty string.

use serde::{Deserialize, Serialize};

/// One element of the registry export array.
///
/// Unknown fields are ignored during deserialization; the record carries only
/// what the CSV output needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryRecord {
    /// Nine-digit organization number.
    pub organisasjonsnummer: Option<String>,
    /// Registered company name.
    pub navn: Option<String>,
    /// Business address block.
    pub forretningsadresse: Option<BusinessAddress>,
    /// Registered e-mail address.
    pub epostadresse: Option<String>,
    /// Registered landline number.
    pub telefon: Option<String>,
    /// Registered mobile number.
    pub mobil: Option<String>,
}

/// The `forretningsadresse` sub-object of a registry record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessAddress {
    /// Street address lines.
    pub adresse: Option<Vec<String>>,
    /// Postal code.
    pub postnummer: Option<String>,
    /// Postal place name.
    pub poststed: Option<String>,
}

/// One output row of the enriched CSV.
///
/// Field order matches the CSV header exactly; the `csv` writer serializes
/// the struct in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRow {
    /// Nine-digit organization number, or empty.
    pub organisasjonsnummer: String,
    /// Trimmed company name, or empty.
    pub navn: String,
    /// Composed street address + postal code + place, or empty.
    pub adresse: String,
    /// Postal code, or empty.
    pub postnummer: String,
    /// Trimmed e-mail address, or empty.
    pub epostadresse: String,
    /// Trimmed landline number, or empty.
    pub telefon: String,
    /// Trimmed mobile number, or empty.
    pub mobil: String,
    /// Best-guess official website, or empty when none was identified.
    pub company_website: String,
}

/// Extracts CSV row fields from one registry record.
///
/// Pure and total: a record missing every field yields a row of empty
/// strings. The `adresse` column concatenates the street address lines
/// (joined by `", "`) with `"postnummer poststed"` (single space, empty parts
/// omitted), the two pieces joined by `", "` with empty pieces omitted.
/// The `company_website` column is left empty; enrichment fills it in later.
#[must_use]
pub fn extract_row(record: &RegistryRecord) -> CompanyRow {
    let address = record.forretningsadresse.as_ref();

    let street = address
        .and_then(|a| a.adresse.as_deref())
        .unwrap_or_default()
        .join(", ")
        .trim()
        .to_string();
    let postnummer = address
        .and_then(|a| a.postnummer.clone())
        .unwrap_or_default();
    let poststed = trimmed(address.and_then(|a| a.poststed.as_deref()));

    let postnummer_poststed = join_nonempty(&[&postnummer, &poststed], " ");
    let adresse = join_nonempty(&[&street, &postnummer_poststed], ", ");

    CompanyRow {
        organisasjonsnummer: record.organisasjonsnummer.clone().unwrap_or_default(),
        navn: trimmed(record.navn.as_deref()),
        adresse,
        postnummer,
        epostadresse: trimmed(record.epostadresse.as_deref()),
        telefon: trimmed(record.telefon.as_deref()),
        mobil: trimmed(record.mobil.as_deref()),
        company_website: String::new(),
    }
}

/// Trims an optional string, mapping absence to empty.
fn trimmed(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_string()
}

/// Joins the non-empty parts with a separator.
fn join_nonempty(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .copied()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_full_record() {
        let record: RegistryRecord = serde_json::from_str(
            r#"{
                "organisasjonsnummer": "918654062",
                "navn": " Fjellheim Bakeri AS ",
                "forretningsadresse": {
                    "adresse": ["Storgata 1", "Inngang B"],
                    "postnummer": "7013",
                    "poststed": "TRONDHEIM "
                },
                "epostadresse": "post@fjellheim.no ",
                "telefon": "73 52 00 00",
                "mobil": " 900 00 000",
                "organisasjonsform": {"kode": "AS"}
            }"#,
        )
        .unwrap();

        let row = extract_row(&record);
        assert_eq!(row.organisasjonsnummer, "918654062");
        assert_eq!(row.navn, "Fjellheim Bakeri AS");
        assert_eq!(row.adresse, "Storgata 1, Inngang B, 7013 TRONDHEIM");
        assert_eq!(row.postnummer, "7013");
        assert_eq!(row.epostadresse, "post@fjellheim.no");
        assert_eq!(row.telefon, "73 52 00 00");
        assert_eq!(row.mobil, "900 00 000");
        assert_eq!(row.company_website, "");
    }

    #[test]
    fn test_extract_empty_record_is_total() {
        let record: RegistryRecord = serde_json::from_str("{}").unwrap();
        let row = extract_row(&record);
        assert_eq!(row, CompanyRow::default());
    }

    #[test]
    fn test_extract_address_without_street_lines() {
        let record: RegistryRecord = serde_json::from_str(
            r#"{"forretningsadresse": {"postnummer": "0150", "poststed": "OSLO"}}"#,
        )
        .unwrap();
        let row = extract_row(&record);
        assert_eq!(row.adresse, "0150 OSLO");
        assert_eq!(row.postnummer, "0150");
    }

    #[test]
    fn test_extract_address_without_postal_fields() {
        let record: RegistryRecord = serde_json::from_str(
            r#"{"forretningsadresse": {"adresse": ["Havnegata 9"]}}"#,
        )
        .unwrap();
        let row = extract_row(&record);
        assert_eq!(row.adresse, "Havnegata 9");
        assert_eq!(row.postnummer, "");
    }

    #[test]
    fn test_extract_poststed_only() {
        let record: RegistryRecord =
            serde_json::from_str(r#"{"forretningsadresse": {"poststed": "BERGEN"}}"#).unwrap();
        let row = extract_row(&record);
        assert_eq!(row.adresse, "BERGEN");
    }

    #[test]
    fn test_extract_ignores_unknown_fields() {
        let record: RegistryRecord = serde_json::from_str(
            r#"{"navn": "Acme AS", "registreringsdatoEnhetsregisteret": "2001-01-01"}"#,
        )
        .unwrap();
        assert_eq!(extract_row(&record).navn, "Acme AS");
    }
}
