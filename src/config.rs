use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::period::{validate_year, SubPeriod};
use crate::population::NormalizerOptions;
use crate::revenue::fetcher::DEFAULT_MAX_PAGES;
use crate::revenue::http::{SiconfiOptions, DEFAULT_ANNEX, DEFAULT_RREO_URL};
use crate::revenue::wide::DEFAULT_WIDE_SHEET;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub revenue: RevenueConfig,
    #[serde(default)]
    pub wide: WideConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    #[serde(default = "default_years")]
    pub years: Vec<i32>,
    /// File name under `data_dir`; `{year}` is replaced by the year.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,
    #[serde(default = "default_population_output")]
    pub output_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_annex")]
    pub annex: u8,
    #[serde(default = "default_years")]
    pub years: Vec<i32>,
    #[serde(default = "default_periods")]
    pub periods: Vec<u8>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_revenue_output")]
    pub output_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WideConfig {
    #[serde(default = "default_wide_file")]
    pub file: String,
    #[serde(default = "default_wide_sheet")]
    pub sheet: String,
    #[serde(default = "default_wide_output")]
    pub output_file: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<String>,
    pub output_dir: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/uf-ledger/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.paths.data_dir = data_dir;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.paths.output_dir = output_dir;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.paths.data_dir)
    }

    pub fn resolved_output_dir(&self) -> PathBuf {
        expand_tilde(&self.paths.output_dir)
    }

    pub fn population_output_path(&self) -> PathBuf {
        self.resolved_output_dir().join(&self.population.output_file)
    }

    pub fn revenue_output_path(&self) -> PathBuf {
        self.resolved_output_dir().join(&self.revenue.output_file)
    }

    pub fn wide_input_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.wide.file)
    }

    pub fn wide_output_path(&self) -> PathBuf {
        self.resolved_output_dir().join(&self.wide.output_file)
    }

    pub fn default_template() -> String {
        let template = r#"[paths]
data_dir = "./dados"
output_dir = "./saida"

[population]
years = [2019, 2020, 2021, 2022, 2023]
file_pattern = "populacao_uf_{year}.xlsx"
skip_rows = 1
output_file = "populacao_ibge_final_2019_2023.csv"

[revenue]
base_url = "https://apidatalake.tesouro.gov.br/ords/siconfi/tt/rreo"
annex = 8
years = [2019, 2020, 2021, 2022, 2023]
periods = [1, 2, 3, 4, 5, 6]
timeout_secs = 10
connect_timeout_secs = 6
min_interval_ms = 1100
max_pages = 50
output_file = "arrecadacao_estadual_2019_2023.csv"

[wide]
file = "Arrecadacao por setor.xlsx"
sheet = "arrecadacao por setor "
output_file = "arrecadacao_por_setor_consolidada.csv"
"#;
        template.to_string()
    }
}

impl PopulationConfig {
    pub fn normalizer_options(&self) -> NormalizerOptions {
        NormalizerOptions {
            skip_rows: self.skip_rows,
        }
    }

    pub fn validated_years(&self) -> Result<Vec<i32>> {
        validated_years(&self.years)
    }
}

impl RevenueConfig {
    pub fn client_options(&self) -> SiconfiOptions {
        SiconfiOptions {
            base_url: self.base_url.clone(),
            annex: self.annex,
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn validated_years(&self) -> Result<Vec<i32>> {
        validated_years(&self.years)
    }

    pub fn sub_periods(&self) -> Result<Vec<SubPeriod>> {
        self.periods
            .iter()
            .map(|p| SubPeriod::new(*p).with_context(|| "invalid [revenue].periods entry"))
            .collect()
    }
}

fn validated_years(years: &[i32]) -> Result<Vec<i32>> {
    years
        .iter()
        .map(|y| validate_year(*y).with_context(|| "invalid year in config"))
        .collect()
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            years: default_years(),
            file_pattern: default_file_pattern(),
            skip_rows: default_skip_rows(),
            output_file: default_population_output(),
        }
    }
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            annex: default_annex(),
            years: default_years(),
            periods: default_periods(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            min_interval_ms: default_min_interval_ms(),
            max_pages: default_max_pages(),
            output_file: default_revenue_output(),
        }
    }
}

impl Default for WideConfig {
    fn default() -> Self {
        Self {
            file: default_wide_file(),
            sheet: default_wide_sheet(),
            output_file: default_wide_output(),
        }
    }
}

fn default_data_dir() -> String {
    "./dados".to_string()
}

fn default_output_dir() -> String {
    "./saida".to_string()
}

fn default_years() -> Vec<i32> {
    (2019..=2023).collect()
}

fn default_file_pattern() -> String {
    "populacao_uf_{year}.xlsx".to_string()
}

fn default_skip_rows() -> usize {
    1
}

fn default_population_output() -> String {
    "populacao_ibge_final_2019_2023.csv".to_string()
}

fn default_base_url() -> String {
    DEFAULT_RREO_URL.to_string()
}

fn default_annex() -> u8 {
    DEFAULT_ANNEX
}

fn default_periods() -> Vec<u8> {
    (SubPeriod::FIRST..=SubPeriod::LAST).collect()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    6
}

fn default_min_interval_ms() -> u64 {
    1100
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_revenue_output() -> String {
    "arrecadacao_estadual_2019_2023.csv".to_string()
}

fn default_wide_file() -> String {
    "Arrecadacao por setor.xlsx".to_string()
}

fn default_wide_sheet() -> String {
    DEFAULT_WIDE_SHEET.to_string()
}

fn default_wide_output() -> String {
    "arrecadacao_por_setor_consolidada.csv".to_string()
}
