//! Schema Descriptor
//!
//! Static description of the document-extraction database. It is only ever
//! embedded in prompts; nothing in the crate parses it.

/// Tables, columns, types and column comments of the extraction database.
pub const SCHEMA_DESCRIPTOR: &str = r#"
Table: pages(
    /* Raw information about each page in a document and
       whether/how each page was classified */
    id SERIAL PRIMARY KEY,
    filename TEXT,          /* File name of the uploaded document */
    preprocessed TEXT,      /* File path of a page's final preprocessed image */
    page_number INTEGER,    /* Page number in the document */
    image_width REAL,       /* Width of the page image */
    image_height REAL,      /* Height of the page image */
    lines TEXT,             /* Extracted lines of text */
    words TEXT,             /* Extracted words */
    bboxes TEXT,            /* Bounding boxes of words */
    normalized_bboxes TEXT, /* Normalized bounding boxes */
    tokens TEXT,            /* Extracted tokens */
    words_for_clf TEXT,     /* Words used for classification */
    processing_time REAL,   /* Time taken for processing */
    clf_type TEXT,          /* Type of classifier used */
    page_label TEXT,        /* Predicted label for the page */
    page_confidence REAL,   /* Confidence score for the label */
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
Table: extracted2(
    /* Key-value facts extracted from the pages of a document */
    key TEXT,               /* Designated key (e.g. first_name, gross_revenue) */
    value TEXT,             /* Extracted value for the key */
    filename TEXT,          /* Foreign key to pages.preprocessed */
    page_label TEXT,        /* Type of page, corresponds to pages.page_label */
    page_confidence REAL,   /* Confidence of page_label, corresponds to pages.page_confidence */
    page_num INTEGER,       /* Page number in the document */
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
Table: entities(
    /* Unique person or business entities */
    entity_id SERIAL PRIMARY KEY,
    entity_type TEXT,       /* 'person' or 'business' */
    entity_name TEXT,       /* Full name or business name */
    additional_info TEXT,   /* JSON metadata (normalized address, EIN, SSN) */
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
Table: page_entity_crosswalk(
    /* Many-to-many link between pages and entities */
    crosswalk_id SERIAL PRIMARY KEY,
    page_id INTEGER,        /* Foreign key to pages.id */
    entity_id INTEGER,      /* Foreign key to entities.entity_id */
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
Table: conversations(
    id SERIAL PRIMARY KEY,
    title TEXT,
    conversation TEXT,      /* JSON-serialized list of {role, content} messages */
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Logical table names described by [`SCHEMA_DESCRIPTOR`].
pub const TABLES: [&str; 5] = [
    "pages",
    "extracted2",
    "entities",
    "page_entity_crosswalk",
    "conversations",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_mentions_every_table() {
        for table in TABLES {
            assert!(
                SCHEMA_DESCRIPTOR.contains(&format!("Table: {}(", table)),
                "missing table {}",
                table
            );
        }
    }
}
