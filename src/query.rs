//! Query builder
//!
//! Registries store the CNPJ inconsistently: bare digits, punctuated, or
//! embedded in free-text party fields. The Elasticsearch dialect therefore
//! matches several encodings at once. This is a best-effort compatibility
//! shim; it does not guarantee identical recall across registries.

use serde_json::{json, Map, Value};

use crate::catalog::{EndpointDescriptor, HttpMethod, QueryDialect};
use crate::cnpj::Cnpj;

const PARTY_DOCUMENT: &str = "dadosBasicos.polo.pessoa.documento";
const LAWYER_DOCUMENT: &str = "dadosBasicos.polo.advogado.documento";
const PARTY_NAME: &str = "dadosBasicos.polo.pessoa.nome";
const SUBJECT_NAME: &str = "dadosBasicos.assunto.nome";
const DISTRIBUTION_DATE: &str = "dadosBasicos.dataDistribuicao";

/// A query ready to hand to the transport
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// JSON request body (POST)
    Body(Value),
    /// URL query parameters (GET)
    Params(Vec<(String, String)>),
}

/// Build the query for one endpoint
pub fn build_query(cnpj: &Cnpj, endpoint: &EndpointDescriptor, page_size: usize) -> SearchQuery {
    match &endpoint.dialect {
        QueryDialect::Elasticsearch => SearchQuery::Body(elasticsearch_query(cnpj, page_size)),
        QueryDialect::DocumentField { field, punctuated } => {
            let value = if *punctuated {
                cnpj.formatted()
            } else {
                cnpj.digits().to_string()
            };
            let mut object = Map::new();
            object.insert(field.clone(), Value::String(value));
            if let Value::Object(extras) = &endpoint.query_extras {
                for (k, v) in extras {
                    object.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
            match endpoint.method {
                HttpMethod::Post => SearchQuery::Body(Value::Object(object)),
                HttpMethod::Get => SearchQuery::Params(
                    object
                        .into_iter()
                        .map(|(k, v)| (k, param_value(&v)))
                        .collect(),
                ),
            }
        }
    }
}

/// Multi-encoding bool/should query, newest distribution first
pub fn elasticsearch_query(cnpj: &Cnpj, page_size: usize) -> Value {
    let raw = cnpj.digits();
    let punctuated = cnpj.formatted();

    json!({
        "query": {
            "bool": {
                "should": [
                    { "match": { PARTY_DOCUMENT: raw } },
                    { "match": { PARTY_DOCUMENT: punctuated } },
                    { "match": { LAWYER_DOCUMENT: raw } },
                    { "match": { LAWYER_DOCUMENT: punctuated } },
                    { "wildcard": { format!("{PARTY_DOCUMENT}.keyword"): format!("*{raw}*") } },
                    { "wildcard": { format!("{PARTY_DOCUMENT}.keyword"): format!("*{punctuated}*") } },
                    { "match": { PARTY_NAME: raw } },
                    { "match": { SUBJECT_NAME: raw } }
                ],
                "minimum_should_match": 1
            }
        },
        "size": page_size,
        "from": 0,
        "sort": [
            { DISTRIBUTION_DATE: { "order": "desc" } }
        ]
    })
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Category};

    fn cnpj() -> Cnpj {
        Cnpj::parse("08049394000184").unwrap()
    }

    #[test]
    fn test_elasticsearch_query_covers_encodings() {
        let endpoint = EndpointDescriptor::datajud("tjsp", "TJSP", Category::Civil);
        let SearchQuery::Body(body) = build_query(&cnpj(), &endpoint, 100) else {
            panic!("expected JSON body");
        };

        let should = body["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 8);
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
        assert_eq!(should[0]["match"][PARTY_DOCUMENT], "08049394000184");
        assert_eq!(should[1]["match"][PARTY_DOCUMENT], "08.049.394/0001-84");
        assert_eq!(
            should[4]["wildcard"]["dadosBasicos.polo.pessoa.documento.keyword"],
            "*08049394000184*"
        );
        assert_eq!(
            should[5]["wildcard"]["dadosBasicos.polo.pessoa.documento.keyword"],
            "*08.049.394/0001-84*"
        );
        assert_eq!(body["size"], 100);
        assert_eq!(body["sort"][0][DISTRIBUTION_DATE]["order"], "desc");
    }

    #[test]
    fn test_document_field_post_body() {
        let catalog = Catalog::builtin();
        let endpoint = catalog.get("tst_certificate").unwrap();
        let SearchQuery::Body(body) = build_query(&cnpj(), endpoint, 100) else {
            panic!("expected JSON body");
        };
        assert_eq!(body["cnpjEmpresa"], "08049394000184");
        assert_eq!(body["periodoCompleto"], true);
    }

    #[test]
    fn test_document_field_get_params() {
        let catalog = Catalog::builtin();
        let endpoint = catalog.get("projudi_oab").unwrap();
        let SearchQuery::Params(params) = build_query(&cnpj(), endpoint, 100) else {
            panic!("expected query params");
        };
        assert!(params.contains(&("documento".to_string(), "08.049.394/0001-84".to_string())));
        assert!(params.contains(&("incluirSigilo".to_string(), "true".to_string())));
        assert!(params.contains(&("tipoBusca".to_string(), "DOCUMENTO_PARTE".to_string())));
    }
}
