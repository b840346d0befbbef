//! Proptest generators for property-based testing.

use proptest::prelude::*;

use pubsync_core::{
    now_micros, AuthorKeypair, Document, DocumentBuilder, SyncFilters, WorkspaceAddress,
};

/// Generate a valid author shortname.
pub fn shortname() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{3}".prop_map(String::from)
}

/// Generate a valid workspace address.
pub fn workspace_address() -> impl Strategy<Value = WorkspaceAddress> {
    "\\+[a-z][a-z0-9]{0,14}\\.[a-z0-9]{1,20}".prop_map(|s| {
        WorkspaceAddress::parse(&s).expect("generated workspace address is valid")
    })
}

/// Generate a valid, non-ephemeral path of one to four segments.
pub fn path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_.-]{1,6}", 1..=4).prop_map(|segments| {
        segments
            .iter()
            .map(|s| format!("/{}", s))
            .collect::<String>()
    })
}

/// Generate a path prefix. Short, so it often matches generated paths.
pub fn path_prefix() -> impl Strategy<Value = String> {
    "/[a-z0-9]{0,2}".prop_map(String::from)
}

/// Generate path-prefix-only filters, never unfiltered.
pub fn prefix_filters() -> impl Strategy<Value = SyncFilters> {
    prop::collection::btree_set(path_prefix(), 1..=3).prop_map(|prefixes| SyncFilters {
        path_prefixes: prefixes,
        ..SyncFilters::default()
    })
}

/// Generate document content. Empty content is a tombstone.
pub fn content() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(String::new()),
        4 => "[a-zA-Z0-9 ]{1,40}".prop_map(String::from),
    ]
}

/// Parameters for generating a document.
#[derive(Debug, Clone)]
pub struct DocParams {
    pub shortname: String,
    pub seed: [u8; 32],
    pub path: String,
    pub content: String,
    /// How long ago the document was written, in microseconds.
    pub age: i64,
}

impl Arbitrary for DocParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            shortname(),
            any::<[u8; 32]>(),
            path(),
            content(),
            0i64..=1_000_000_000_000i64, // up to ~11 days
        )
            .prop_map(|(shortname, seed, path, content, age)| DocParams {
                shortname,
                seed,
                path,
                content,
                age,
            })
            .boxed()
    }
}

/// Generate a signed document from parameters.
pub fn document_from_params(params: &DocParams, workspace: &WorkspaceAddress) -> Document {
    let author = AuthorKeypair::from_seed(&params.shortname, &params.seed)
        .expect("generated shortname is valid");
    DocumentBuilder::new(workspace.clone(), params.path.clone())
        .content(params.content.clone())
        .timestamp(now_micros() - params.age)
        .sign(&author)
        .expect("signing a generated document")
}

/// Generate a set of `(path, content)` pairs with distinct paths.
pub fn doc_set(max: usize) -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map(path(), content(), 0..=max)
        .prop_map(|entries| entries.into_iter().collect())
}
