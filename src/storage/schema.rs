//! Database schema constants for the PostgreSQL backend.

/// SQL schema for creating the generation_batches table.
pub const CREATE_GENERATION_BATCHES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS generation_batches (
    batch_id VARCHAR(64) PRIMARY KEY,
    user_id UUID NOT NULL,
    input_text TEXT NOT NULL,
    generation_count SMALLINT NOT NULL,
    generation_strategy SMALLINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL schema for creating the generation_results table.
pub const CREATE_GENERATION_RESULTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS generation_results (
    result_id VARCHAR(64) PRIMARY KEY,
    batch_id VARCHAR(64) NOT NULL REFERENCES generation_batches(batch_id) ON DELETE CASCADE,
    conversation_id VARCHAR(64) NOT NULL,
    artifact_payload JSONB NOT NULL,
    label SMALLINT NOT NULL DEFAULT 0,
    labeled_at TIMESTAMPTZ,
    strategy SMALLINT,
    error_message TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL schema for creating the conversations table.
pub const CREATE_CONVERSATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    conversation_id VARCHAR(64) PRIMARY KEY,
    user_id UUID NOT NULL,
    messages JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL schema for creating the promoted_documents table.
pub const CREATE_PROMOTED_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS promoted_documents (
    document_id VARCHAR(64) PRIMARY KEY,
    user_id UUID NOT NULL,
    title TEXT NOT NULL,
    layout VARCHAR(100) NOT NULL,
    description TEXT NOT NULL,
    content JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Every schema statement with the name it is recorded under, in apply
/// order: tables first (results reference batches), then one statement
/// per index.
pub fn versioned_statements() -> Vec<(&'static str, &'static str)> {
    vec![
        ("v1_generation_batches", CREATE_GENERATION_BATCHES_TABLE),
        ("v1_generation_results", CREATE_GENERATION_RESULTS_TABLE),
        ("v1_conversations", CREATE_CONVERSATIONS_TABLE),
        ("v1_promoted_documents", CREATE_PROMOTED_DOCUMENTS_TABLE),
        (
            "v1_idx_batches_user",
            "CREATE INDEX IF NOT EXISTS idx_generation_batches_user_id ON generation_batches(user_id)",
        ),
        (
            "v1_idx_batches_created",
            "CREATE INDEX IF NOT EXISTS idx_generation_batches_created_at ON generation_batches(created_at)",
        ),
        (
            "v1_idx_results_batch",
            "CREATE INDEX IF NOT EXISTS idx_generation_results_batch_id ON generation_results(batch_id)",
        ),
        (
            "v1_idx_results_label",
            "CREATE INDEX IF NOT EXISTS idx_generation_results_label ON generation_results(label)",
        ),
        (
            "v1_idx_results_created",
            "CREATE INDEX IF NOT EXISTS idx_generation_results_created_at ON generation_results(created_at)",
        ),
        (
            "v1_idx_conversations_user",
            "CREATE INDEX IF NOT EXISTS idx_conversations_user_id ON conversations(user_id)",
        ),
        (
            "v1_idx_documents_user",
            "CREATE INDEX IF NOT EXISTS idx_promoted_documents_user_id ON promoted_documents(user_id)",
        ),
    ]
}

/// Table names in the schema.
pub mod tables {
    /// Generation batches table name.
    pub const GENERATION_BATCHES: &str = "generation_batches";
    /// Generation results table name.
    pub const GENERATION_RESULTS: &str = "generation_results";
    /// Conversations table name.
    pub const CONVERSATIONS: &str = "conversations";
    /// Promoted documents table name.
    pub const PROMOTED_DOCUMENTS: &str = "promoted_documents";
}
