use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the 27 Brazilian federative units.
///
/// Serialized as its short code (`"SP"`). Ordering follows the short code so
/// consolidated tables sort alphabetically by UF; [`RegionCode::ALL`] keeps
/// the IBGE order used when sweeping the fiscal API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RegionCode {
    Rondonia,
    Acre,
    Amazonas,
    Roraima,
    Para,
    Amapa,
    Tocantins,
    Maranhao,
    Piaui,
    Ceara,
    RioGrandeDoNorte,
    Paraiba,
    Pernambuco,
    Alagoas,
    Sergipe,
    Bahia,
    MinasGerais,
    EspiritoSanto,
    RioDeJaneiro,
    SaoPaulo,
    Parana,
    SantaCatarina,
    RioGrandeDoSul,
    MatoGrossoDoSul,
    MatoGrosso,
    Goias,
    DistritoFederal,
}

impl RegionCode {
    pub const ALL: [RegionCode; 27] = [
        RegionCode::Rondonia,
        RegionCode::Acre,
        RegionCode::Amazonas,
        RegionCode::Roraima,
        RegionCode::Para,
        RegionCode::Amapa,
        RegionCode::Tocantins,
        RegionCode::Maranhao,
        RegionCode::Piaui,
        RegionCode::Ceara,
        RegionCode::RioGrandeDoNorte,
        RegionCode::Paraiba,
        RegionCode::Pernambuco,
        RegionCode::Alagoas,
        RegionCode::Sergipe,
        RegionCode::Bahia,
        RegionCode::MinasGerais,
        RegionCode::EspiritoSanto,
        RegionCode::RioDeJaneiro,
        RegionCode::SaoPaulo,
        RegionCode::Parana,
        RegionCode::SantaCatarina,
        RegionCode::RioGrandeDoSul,
        RegionCode::MatoGrossoDoSul,
        RegionCode::MatoGrosso,
        RegionCode::Goias,
        RegionCode::DistritoFederal,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Rondonia => "RO",
            Self::Acre => "AC",
            Self::Amazonas => "AM",
            Self::Roraima => "RR",
            Self::Para => "PA",
            Self::Amapa => "AP",
            Self::Tocantins => "TO",
            Self::Maranhao => "MA",
            Self::Piaui => "PI",
            Self::Ceara => "CE",
            Self::RioGrandeDoNorte => "RN",
            Self::Paraiba => "PB",
            Self::Pernambuco => "PE",
            Self::Alagoas => "AL",
            Self::Sergipe => "SE",
            Self::Bahia => "BA",
            Self::MinasGerais => "MG",
            Self::EspiritoSanto => "ES",
            Self::RioDeJaneiro => "RJ",
            Self::SaoPaulo => "SP",
            Self::Parana => "PR",
            Self::SantaCatarina => "SC",
            Self::RioGrandeDoSul => "RS",
            Self::MatoGrossoDoSul => "MS",
            Self::MatoGrosso => "MT",
            Self::Goias => "GO",
            Self::DistritoFederal => "DF",
        }
    }

    /// IBGE numeric identifier, as used by the `co_uf` query parameter.
    pub fn ibge_id(&self) -> u8 {
        match self {
            Self::Rondonia => 11,
            Self::Acre => 12,
            Self::Amazonas => 13,
            Self::Roraima => 14,
            Self::Para => 15,
            Self::Amapa => 16,
            Self::Tocantins => 17,
            Self::Maranhao => 21,
            Self::Piaui => 22,
            Self::Ceara => 23,
            Self::RioGrandeDoNorte => 24,
            Self::Paraiba => 25,
            Self::Pernambuco => 26,
            Self::Alagoas => 27,
            Self::Sergipe => 28,
            Self::Bahia => 29,
            Self::MinasGerais => 31,
            Self::EspiritoSanto => 32,
            Self::RioDeJaneiro => 33,
            Self::SaoPaulo => 35,
            Self::Parana => 41,
            Self::SantaCatarina => 42,
            Self::RioGrandeDoSul => 43,
            Self::MatoGrossoDoSul => 50,
            Self::MatoGrosso => 51,
            Self::Goias => 52,
            Self::DistritoFederal => 53,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rondonia => "Rondônia",
            Self::Acre => "Acre",
            Self::Amazonas => "Amazonas",
            Self::Roraima => "Roraima",
            Self::Para => "Pará",
            Self::Amapa => "Amapá",
            Self::Tocantins => "Tocantins",
            Self::Maranhao => "Maranhão",
            Self::Piaui => "Piauí",
            Self::Ceara => "Ceará",
            Self::RioGrandeDoNorte => "Rio Grande do Norte",
            Self::Paraiba => "Paraíba",
            Self::Pernambuco => "Pernambuco",
            Self::Alagoas => "Alagoas",
            Self::Sergipe => "Sergipe",
            Self::Bahia => "Bahia",
            Self::MinasGerais => "Minas Gerais",
            Self::EspiritoSanto => "Espírito Santo",
            Self::RioDeJaneiro => "Rio de Janeiro",
            Self::SaoPaulo => "São Paulo",
            Self::Parana => "Paraná",
            Self::SantaCatarina => "Santa Catarina",
            Self::RioGrandeDoSul => "Rio Grande do Sul",
            Self::MatoGrossoDoSul => "Mato Grosso do Sul",
            Self::MatoGrosso => "Mato Grosso",
            Self::Goias => "Goiás",
            Self::DistritoFederal => "Distrito Federal",
        }
    }

    /// Exact short-code lookup. Labels are trimmed but not case-folded, so
    /// spreadsheet header cells such as `"Sp"` or `"UF"` never match.
    pub fn from_code(code: &str) -> Result<Self, UnknownRegionError> {
        let trimmed = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|region| region.code() == trimmed)
            .ok_or_else(|| UnknownRegionError(code.to_string()))
    }

    pub fn from_ibge_id(id: u8) -> Result<Self, UnknownRegionError> {
        Self::ALL
            .iter()
            .copied()
            .find(|region| region.ibge_id() == id)
            .ok_or_else(|| UnknownRegionError(id.to_string()))
    }

    /// Resolves either a short code or a full state name, ignoring case.
    pub fn resolve_label(label: &str) -> Result<Self, UnknownRegionError> {
        let trimmed = label.trim();
        let upper = trimmed.to_uppercase();
        let lower = trimmed.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|region| region.code() == upper || region.name().to_lowercase() == lower)
            .ok_or_else(|| UnknownRegionError(label.to_string()))
    }

    pub fn is_valid_code(code: &str) -> bool {
        Self::from_code(code).is_ok()
    }
}

impl Display for RegionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl PartialOrd for RegionCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(other.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown region: {0}")]
pub struct UnknownRegionError(pub String);

impl FromStr for RegionCode {
    type Err = UnknownRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.trim().parse::<u8>() {
            return Self::from_ibge_id(id);
        }
        Self::resolve_label(s)
    }
}

impl From<RegionCode> for String {
    fn from(value: RegionCode) -> Self {
        value.code().to_string()
    }
}

impl TryFrom<String> for RegionCode {
    type Error = UnknownRegionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::region::RegionCode;

    #[test]
    fn catalog_has_27_distinct_codes_and_ids() {
        let codes: BTreeSet<_> = RegionCode::ALL.iter().map(|r| r.code()).collect();
        let ids: BTreeSet<_> = RegionCode::ALL.iter().map(|r| r.ibge_id()).collect();
        assert_eq!(codes.len(), 27);
        assert_eq!(ids.len(), 27);
    }

    #[test]
    fn code_and_id_round_trip_through_the_catalog() {
        for region in RegionCode::ALL {
            assert_eq!(RegionCode::from_code(region.code()), Ok(region));
            assert_eq!(RegionCode::from_ibge_id(region.ibge_id()), Ok(region));
        }
        assert_eq!(RegionCode::SaoPaulo.ibge_id(), 35);
        assert_eq!(RegionCode::DistritoFederal.code(), "DF");
    }

    #[test]
    fn unknown_lookups_fail() {
        assert!(RegionCode::from_code("XX").is_err());
        assert!(RegionCode::from_code("sp").is_err());
        assert!(RegionCode::from_ibge_id(34).is_err());
        assert!(!RegionCode::is_valid_code("Total"));
        let err = RegionCode::from_code("Brasil").expect_err("should be unknown");
        assert_eq!(err.to_string(), "unknown region: Brasil");
    }

    #[test]
    fn resolves_names_and_codes_ignoring_case() {
        assert_eq!(
            RegionCode::resolve_label("rio grande do sul"),
            Ok(RegionCode::RioGrandeDoSul)
        );
        assert_eq!(RegionCode::resolve_label(" SÃO PAULO "), Ok(RegionCode::SaoPaulo));
        assert_eq!(RegionCode::resolve_label("rs"), Ok(RegionCode::RioGrandeDoSul));
        assert_eq!("43".parse::<RegionCode>(), Ok(RegionCode::RioGrandeDoSul));
    }

    #[test]
    fn orders_by_short_code() {
        let mut regions = vec![RegionCode::SaoPaulo, RegionCode::Acre, RegionCode::Bahia];
        regions.sort();
        assert_eq!(
            regions,
            vec![RegionCode::Acre, RegionCode::Bahia, RegionCode::SaoPaulo]
        );
    }

    #[test]
    fn serializes_as_short_code() {
        let json = serde_json::to_string(&RegionCode::Para).expect("serialize");
        assert_eq!(json, "\"PA\"");
        let parsed: RegionCode = serde_json::from_str("\"MG\"").expect("deserialize");
        assert_eq!(parsed, RegionCode::MinasGerais);
    }
}
