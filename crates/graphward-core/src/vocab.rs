//! IRIs of the vocabularies the engine writes and filters on.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// ── PROV-O ───────────────────────────────────────────────────────

pub const PROV_ENTITY: &str = "http://www.w3.org/ns/prov#Entity";
pub const PROV_SPECIALIZATION_OF: &str = "http://www.w3.org/ns/prov#specializationOf";
pub const PROV_WAS_ATTRIBUTED_TO: &str = "http://www.w3.org/ns/prov#wasAttributedTo";
pub const PROV_GENERATED_AT_TIME: &str = "http://www.w3.org/ns/prov#generatedAtTime";
pub const PROV_WAS_DERIVED_FROM: &str = "http://www.w3.org/ns/prov#wasDerivedFrom";
pub const PROV_INVALIDATED_AT_TIME: &str = "http://www.w3.org/ns/prov#invalidatedAtTime";
pub const PROV_HAD_PRIMARY_SOURCE: &str = "http://www.w3.org/ns/prov#hadPrimarySource";

pub const DCTERMS_DESCRIPTION: &str = "http://purl.org/dc/terms/description";
pub const OCO_HAS_UPDATE_QUERY: &str = "https://w3id.org/oc/ontology/hasUpdateQuery";
