//! Registry catalog
//!
//! Static mapping from endpoint id to its descriptor: display name, court
//! category, the authentication tier needed to reach it, the query dialect it
//! understands, the response envelope it returns and its URL.
//!
//! The catalog is immutable once built and shared read-only by every search.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SearchError};

const DATAJUD_BASE: &str = "https://api-publica.datajud.cnj.jus.br";

// =============================================================================
// Descriptor enums
// =============================================================================

/// Court category an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Labor,
    Electoral,
    Civil,
    Military,
    Federal,
    Administrative,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Labor,
        Category::Electoral,
        Category::Civil,
        Category::Military,
        Category::Federal,
        Category::Administrative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Labor => "labor",
            Self::Electoral => "electoral",
            Self::Civil => "civil",
            Self::Military => "military",
            Self::Federal => "federal",
            Self::Administrative => "administrative",
        }
    }

    /// Parse a category name (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| SearchError::UnknownCategory(s.to_string()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Authentication tier, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthTier {
    Anonymous,
    Credentialed,
    Certificated,
}

impl AuthTier {
    pub const ALL: [AuthTier; 3] = [
        AuthTier::Anonymous,
        AuthTier::Credentialed,
        AuthTier::Certificated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Credentialed => "credentialed",
            Self::Certificated => "certificated",
        }
    }
}

impl std::fmt::Display for AuthTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuthTier {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anonymous" | "basic" | "public" => Ok(Self::Anonymous),
            "credentialed" | "oab" | "enhanced" => Ok(Self::Credentialed),
            "certificated" | "certificate" | "comprehensive" => Ok(Self::Certificated),
            other => Err(SearchError::Config(format!("unknown tier '{other}'"))),
        }
    }
}

/// How the endpoint expects the identifier to be expressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryDialect {
    /// Elasticsearch bool query over the party document fields
    Elasticsearch,
    /// A single named field carrying the identifier
    DocumentField {
        field: String,
        #[serde(default)]
        punctuated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Post,
    Get,
}

/// Shape of the JSON document an endpoint answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeShape {
    /// `{"hits": {"total": {"value": n}, "hits": [{"_id", "_source"}]}}`
    #[default]
    SearchHits,
    /// `{"total": n, "processos": [...]}`
    ProcessList,
    /// A bare top-level array of records
    Array,
}

// =============================================================================
// Endpoint descriptor
// =============================================================================

/// One independently queryable registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub tier: AuthTier,
    pub dialect: QueryDialect,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub envelope: EnvelopeShape,
    pub url: String,
    /// Data points this endpoint adds beyond the public tier
    #[serde(default)]
    pub features: Vec<String>,
    /// Static flags merged into every query sent to this endpoint
    #[serde(default = "empty_object")]
    pub query_extras: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl EndpointDescriptor {
    /// Public DataJud endpoint for a court alias
    pub fn datajud(id: &str, name: &str, category: Category) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            tier: AuthTier::Anonymous,
            dialect: QueryDialect::Elasticsearch,
            method: HttpMethod::Post,
            envelope: EnvelopeShape::SearchHits,
            url: format!("{DATAJUD_BASE}/api_publica_{id}/_search"),
            features: Vec::new(),
            query_extras: empty_object(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn restricted(
        id: &str,
        name: &str,
        category: Category,
        tier: AuthTier,
        method: HttpMethod,
        url: &str,
        field: &str,
        punctuated: bool,
        extras: Value,
        features: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            tier,
            dialect: QueryDialect::DocumentField {
                field: field.to_string(),
                punctuated,
            },
            method,
            envelope: EnvelopeShape::ProcessList,
            url: url.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
            query_extras: extras,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
struct CatalogFile {
    endpoints: Vec<EndpointDescriptor>,
}

/// Ordered, id-unique set of endpoint descriptors
#[derive(Debug, Clone)]
pub struct Catalog {
    endpoints: Vec<EndpointDescriptor>,
}

impl Catalog {
    pub fn new(endpoints: Vec<EndpointDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for endpoint in &endpoints {
            if !seen.insert(endpoint.id.as_str()) {
                return Err(SearchError::DuplicateEndpoint(endpoint.id.clone()));
            }
            // A search body cannot travel on a GET
            if endpoint.dialect == QueryDialect::Elasticsearch && endpoint.method == HttpMethod::Get {
                return Err(SearchError::InvalidEndpoint {
                    id: endpoint.id.clone(),
                    reason: "elasticsearch dialect requires POST".to_string(),
                });
            }
        }
        Ok(Self { endpoints })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.endpoints)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn get(&self, id: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.id == id)
    }

    /// Endpoints in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Everything reachable at `tier`, lower tiers included
    pub fn for_tier(&self, tier: AuthTier) -> Vec<EndpointDescriptor> {
        self.endpoints
            .iter()
            .filter(|e| e.tier <= tier)
            .cloned()
            .collect()
    }

    /// Only the endpoints that `tier` itself adds
    pub fn tier_only(&self, tier: AuthTier) -> Vec<EndpointDescriptor> {
        self.endpoints
            .iter()
            .filter(|e| e.tier == tier)
            .cloned()
            .collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<EndpointDescriptor> {
        self.endpoints
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    /// The built-in catalog of Brazilian court endpoints
    pub fn builtin() -> Self {
        use AuthTier::{Certificated, Credentialed};
        use Category::*;
        use HttpMethod::{Get, Post};

        let mut endpoints = vec![
            // Superior courts
            EndpointDescriptor::datajud("tst", "Tribunal Superior do Trabalho", Labor),
            EndpointDescriptor::datajud("tse", "Tribunal Superior Eleitoral", Electoral),
            EndpointDescriptor::datajud("stj", "Superior Tribunal de Justiça", Civil),
            EndpointDescriptor::datajud("stm", "Superior Tribunal Militar", Military),
            // Federal courts
            EndpointDescriptor::datajud("trf1", "Tribunal Regional Federal da 1ª Região", Federal),
            EndpointDescriptor::datajud("trf2", "Tribunal Regional Federal da 2ª Região", Federal),
            EndpointDescriptor::datajud("trf3", "Tribunal Regional Federal da 3ª Região", Federal),
            EndpointDescriptor::datajud("trf4", "Tribunal Regional Federal da 4ª Região", Federal),
            EndpointDescriptor::datajud("trf5", "Tribunal Regional Federal da 5ª Região", Federal),
            EndpointDescriptor::datajud("trf6", "Tribunal Regional Federal da 6ª Região", Federal),
            // State courts
            EndpointDescriptor::datajud("tjsp", "Tribunal de Justiça de São Paulo", Civil),
            EndpointDescriptor::datajud("tjrj", "Tribunal de Justiça do Rio de Janeiro", Civil),
            EndpointDescriptor::datajud("tjmg", "Tribunal de Justiça de Minas Gerais", Civil),
            EndpointDescriptor::datajud("tjrs", "Tribunal de Justiça do Rio Grande do Sul", Civil),
            EndpointDescriptor::datajud("tjpr", "Tribunal de Justiça do Paraná", Civil),
            // Regional labor courts
            EndpointDescriptor::datajud("trt1", "Tribunal Regional do Trabalho da 1ª Região", Labor),
            EndpointDescriptor::datajud("trt2", "Tribunal Regional do Trabalho da 2ª Região", Labor),
            EndpointDescriptor::datajud("trt3", "Tribunal Regional do Trabalho da 3ª Região", Labor),
            EndpointDescriptor::datajud("trt4", "Tribunal Regional do Trabalho da 4ª Região", Labor),
            EndpointDescriptor::datajud("trt9", "Tribunal Regional do Trabalho da 9ª Região", Labor),
            EndpointDescriptor::datajud("trt15", "Tribunal Regional do Trabalho da 15ª Região", Labor),
        ];

        // License-gated (OAB) systems
        endpoints.extend([
            EndpointDescriptor::restricted(
                "pje_advanced",
                "PJe Advanced Search",
                Civil,
                Credentialed,
                Post,
                "https://pje.tjsp.jus.br/pje/advogado/processo/consulta/avancada",
                "documentoPartes",
                false,
                serde_json::json!({
                    "tipoConsulta": "COMPLETA",
                    "incluirSegredos": true,
                    "incluirDocumentos": true
                }),
                &["confidential_data", "sealed_proceedings", "document_access", "real_time_status"],
            ),
            EndpointDescriptor::restricted(
                "projudi_oab",
                "PROJUDI OAB Access",
                Civil,
                Credentialed,
                Get,
                "https://projudi.tjsp.jus.br/projudi/advogado/processo/consulta",
                "documento",
                true,
                serde_json::json!({
                    "tipoBusca": "DOCUMENTO_PARTE",
                    "incluirArquivados": true,
                    "incluirSigilo": true
                }),
                &["complete_case_files", "archived_processes", "confidential_proceedings", "document_downloads"],
            ),
            EndpointDescriptor::restricted(
                "esaj_advanced",
                "e-SAJ Advanced Access",
                Civil,
                Credentialed,
                Post,
                "https://esaj.tjsp.jus.br/esaj/advogado/consulta/avancada",
                "documentoParte",
                false,
                serde_json::json!({
                    "incluirProcessosSigilo": true,
                    "incluirProcessosArquivados": true,
                    "detalhamentoCompleto": true
                }),
                &["sealed_documents", "archived_cases", "advanced_search_filters", "complete_procedural_history"],
            ),
        ]);

        // Digital-certificate systems
        endpoints.extend([
            EndpointDescriptor::restricted(
                "pje_certificate",
                "PJe Digital Certificate API",
                Labor,
                Certificated,
                Post,
                "https://pje-consulta.tst.jus.br/certificado/processo/busca",
                "documento",
                false,
                serde_json::json!({
                    "nivelAcesso": "COMPLETO",
                    "incluirSensivel": true,
                    "incluirFinanceiro": true
                }),
                &["all_process_data", "sensitive_information", "financial_data", "complete_case_history", "document_downloads"],
            ),
            EndpointDescriptor::restricted(
                "federal_certificate",
                "Federal Court Certificate API",
                Federal,
                Certificated,
                Get,
                "https://eproc.jfpr.jus.br/eproc/certificado/consulta",
                "documento",
                false,
                serde_json::json!({
                    "instancia": "TODAS",
                    "incluirExecucoes": true,
                    "incluirAdministrativo": true
                }),
                &["federal_processes", "tax_cases", "administrative_proceedings", "execution_processes"],
            ),
            EndpointDescriptor::restricted(
                "tst_certificate",
                "TST Certificate API",
                Labor,
                Certificated,
                Post,
                "https://pje.tst.jus.br/certificado/api/consulta/empresa",
                "cnpjEmpresa",
                false,
                serde_json::json!({
                    "incluirReclamacoes": true,
                    "incluirDissidios": true,
                    "incluirExecucoes": true,
                    "periodoCompleto": true
                }),
                &["labor_disputes", "employment_cases", "union_proceedings", "wage_claims", "collective_bargaining_cases"],
            ),
            EndpointDescriptor::restricted(
                "stj_certificate",
                "STJ Certificate API",
                Civil,
                Certificated,
                Post,
                "https://ww2.stj.jus.br/certificado/api/consulta",
                "documentoPartes",
                false,
                serde_json::json!({
                    "incluirRecursos": true,
                    "incluirConstitucionais": true,
                    "detalhamentoMaximo": true
                }),
                &["appeals", "constitutional_cases", "precedent_setting_cases", "superior_court_decisions"],
            ),
            EndpointDescriptor::restricted(
                "cnj_advanced",
                "CNJ Advanced Certificate API",
                Administrative,
                Certificated,
                Get,
                "https://painel.cnj.jus.br/api/certificado/consulta/empresa",
                "cnpj",
                false,
                serde_json::json!({
                    "nivelDetalhamento": "COMPLETO",
                    "incluirEstatisticas": true,
                    "incluirAdministrativo": true,
                    "incluirDadosJuizes": true
                }),
                &["all_court_data", "statistical_data", "administrative_data", "judge_performance_data", "court_efficiency_metrics"],
            ),
        ]);

        Self { endpoints }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
