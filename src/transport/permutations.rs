//! Permutation hashes, per-service RPC hashes, and module-relative URLs
//! observed in a captured client bundle (SPEC_FULL.md §B.6). A server-side
//! redeploy changes these; when RPC calls start failing across the board this
//! file is the first thing to re-derive from a fresh bundle, which is why
//! they're collected here instead of inlined at each call site.

/// `X-GWT-Permutation` header value for requests against the `skema` module.
pub const SKEMA_PERMUTATION: &str = "B0742ABB769CAA45E3CD75BA219C6E04";
/// `X-GWT-Permutation` header value for requests against the `opgave` module.
pub const OPGAVE_PERMUTATION: &str = "ED91C3E5761A98C33045A799A1B8B8B1";

/// Per-service hash baked into the payload body itself (distinct from the
/// permutation header, and different per RPC service even within one module).
pub const SKEMA_SERVICE_HASH: &str = "83C0398D428292FBFA6ED34FEEEA605B";
pub const SKEMA_NOTE_SERVICE_HASH: &str = "EB1BAA9F2AD8A53B59DC22F1082E0E1B";
pub const RESSOURCE_SERVICE_HASH: &str = "09D4724C79CC98B839803FCB9CBF2218";
pub const OPGAVE_SERVICE_HASH: &str = "459B74E0E07134BC40784E117D837355";

pub const SKEMA_MODULE_BASE: &str = "/skema/skema/";
pub const OPGAVE_MODULE_BASE: &str = "/opgave/opgave/";

pub const SKEMA_SERVICE_PATH: &str = "/skema/skema/skemaservice";
pub const SKEMA_NOTE_SERVICE_PATH: &str = "/skema/skemanoteservice";
pub const RESSOURCE_SERVICE_PATH: &str = "/skema/ressourceservice";
pub const OPGAVE_SERVICE_PATH: &str = "/opgave/opgaveservice";

/// `RessourceObjektType` ordinal used when listing files for a lesson.
pub const CONTAINER_TYPE_SKEMA: u32 = 12;
/// `RessourceObjektType` ordinal used when listing files for an assignment.
pub const CONTAINER_TYPE_OPGAVE: u32 = 5;
