//! Prompt Builder
//!
//! Composes the instruction header, the schema, worked examples and the
//! user's question into a single completion request.

/// A natural-language request paired with the SQL that answers it.
#[derive(Debug, Clone, Copy)]
pub struct WorkedExample {
    pub request: &'static str,
    pub sql: &'static str,
}

/// Worked examples covering filtering, aggregation, multi-table joins,
/// CTEs and negative existence.
pub const WORKED_EXAMPLES: [WorkedExample; 6] = [
    WorkedExample {
        request: "Show me tax return data on Company XYZ for the last 3 years. Exclude balance sheet items.",
        sql: r#"SELECT e.filename,
       e.key,
       e.value,
       e.page_label,
       p.created_at,
       ent.entity_name
FROM extracted2 e
JOIN pages p ON e.filename = p.preprocessed
JOIN page_entity_crosswalk pc ON p.id = pc.page_id
JOIN entities ent ON pc.entity_id = ent.entity_id
WHERE ent.entity_name = 'Company XYZ'
  AND p.created_at >= NOW() - INTERVAL '3 years'
  AND e.page_label NOT IN ('1120S_bal_sheet', '1065_bal_sheet', '1120_bal_sheet')
ORDER BY p.created_at DESC;"#,
    },
    WorkedExample {
        request: "What is the insured property address for Company ABC's insurance?",
        sql: r#"SELECT e.filename,
       MAX(CASE WHEN e.key = 'property_address' THEN e.value END) AS property_address,
       ent.entity_name
FROM extracted2 e
JOIN pages p ON e.filename = p.preprocessed
JOIN page_entity_crosswalk pc ON p.id = pc.page_id
JOIN entities ent ON pc.entity_id = ent.entity_id
WHERE ent.entity_name = 'Company ABC'
  AND e.page_label IN ('acord_28', 'acord_25')
GROUP BY e.filename, ent.entity_name;"#,
    },
    WorkedExample {
        request: "Does AAA Inc. have a lease? What are the lease terms on it?",
        sql: r#"SELECT e.filename,
       MAX(CASE WHEN e.key = 'lease_start_date' THEN e.value END) AS lease_start_date,
       MAX(CASE WHEN e.key = 'lease_end_date' THEN e.value END) AS lease_end_date,
       MAX(CASE WHEN e.key = 'term_length' THEN e.value END) AS term_length,
       ent.entity_name
FROM extracted2 e
JOIN pages p ON e.filename = p.preprocessed
JOIN page_entity_crosswalk pc ON p.id = pc.page_id
JOIN entities ent ON pc.entity_id = ent.entity_id
WHERE ent.entity_name = 'AAA Inc.'
  AND e.page_label = 'lease_document'
GROUP BY e.filename, ent.entity_name;"#,
    },
    WorkedExample {
        request: "Who are the owners of MM Corp, and do we have drivers licenses for them?",
        sql: r#"WITH owners AS (
    SELECT DISTINCT e.filename,
           e.value AS owner_name
    FROM extracted2 e
    JOIN pages p ON e.filename = p.preprocessed
    JOIN page_entity_crosswalk pc ON p.id = pc.page_id
    JOIN entities ent ON pc.entity_id = ent.entity_id
    WHERE ent.entity_name = 'MM Corp'
      AND e.key = 'shareholder_name'
      AND e.page_label IN ('1120S_k1', '1065_k1')
),
drivers AS (
    SELECT DISTINCT ent.entity_name AS person_name
    FROM extracted2 e
    JOIN pages p ON e.filename = p.preprocessed
    JOIN page_entity_crosswalk pc ON p.id = pc.page_id
    JOIN entities ent ON pc.entity_id = ent.entity_id
    WHERE e.page_label = 'drivers_license'
      AND ent.entity_type = 'person'
)
SELECT o.owner_name,
       CASE WHEN d.person_name IS NOT NULL THEN 'Yes' ELSE 'No' END AS has_drivers_license
FROM owners o
LEFT JOIN drivers d ON o.owner_name = d.person_name;"#,
    },
    WorkedExample {
        request: "Do we have a certificate of good standing for JJ LLC?",
        sql: r#"SELECT e.filename,
       MAX(CASE WHEN e.key = 'business_name' THEN e.value END) AS business_name,
       MAX(CASE WHEN e.key = 'current_standing' THEN e.value END) AS current_standing,
       MAX(CASE WHEN e.key = 'date_incorporated' THEN e.value END) AS date_incorporated,
       ent.entity_name
FROM extracted2 e
JOIN pages p ON e.filename = p.preprocessed
JOIN page_entity_crosswalk pc ON p.id = pc.page_id
JOIN entities ent ON pc.entity_id = ent.entity_id
WHERE ent.entity_name = 'JJ LLC'
  AND e.page_label = 'certificate_of_good_standing'
GROUP BY e.filename, ent.entity_name;"#,
    },
    WorkedExample {
        request: "Which business entities have no documents linked to them?",
        sql: r#"SELECT ent.entity_id,
       ent.entity_name
FROM entities ent
WHERE ent.entity_type = 'business'
  AND NOT EXISTS (
      SELECT 1
      FROM page_entity_crosswalk pc
      WHERE pc.entity_id = ent.entity_id
  )
ORDER BY ent.entity_name;"#,
    },
];

const HEADER: &str = "You are an expert data scientist specialized in SQL query generation. \
Analyze the provided PostgreSQL database schema and think step-by-step to produce precise and optimized SQL queries.";

const INSTRUCTIONS: &str = "Generate only valid PostgreSQL SQL queries (SELECT, WITH, INSERT, UPDATE, DELETE, CREATE, DROP, ALTER). \
For complex requests, carefully review the schema and consider joining multiple tables. \
Use information_schema for metadata queries when necessary.";

const FOOTER: &str = "Your answer must be a single, valid PostgreSQL SQL query with no additional commentary.";

/// Builds completion prompts against a fixed schema.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema: String,
}

impl PromptBuilder {
    pub fn new(schema: impl Into<String>) -> Self {
        Self { schema: schema.into() }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn build(&self, question: &str) -> String {
        build_prompt(question, &self.schema)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(crate::schema::SCHEMA_DESCRIPTOR)
    }
}

/// Render the worked examples block.
pub fn render_examples() -> String {
    let mut out = String::from("Examples of valid queries:\n");
    for (idx, example) in WORKED_EXAMPLES.iter().enumerate() {
        out.push_str(&format!("\n{}) \"{}\"\n{}\n", idx + 1, example.request, example.sql));
    }
    out
}

/// Build the full prompt. The question is embedded verbatim, even when empty.
pub fn build_prompt(question: &str, schema: &str) -> String {
    format!(
        "{header}\n\nDatabase Schema:\n{schema}\n\n{instructions}\n\n{examples}\n\
Write a SQL query to answer the following natural language request:\n\"\"\"{question}\"\"\"\n\n{footer}\n",
        header = HEADER,
        schema = schema.trim(),
        instructions = INSTRUCTIONS,
        examples = render_examples(),
        question = question,
        footer = FOOTER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SCHEMA_DESCRIPTOR;

    #[test]
    fn test_prompt_embeds_schema_and_question() {
        let question = "Show me tax return data on Company XYZ for the last 3 years.";
        let prompt = build_prompt(question, SCHEMA_DESCRIPTOR);

        assert!(prompt.contains(SCHEMA_DESCRIPTOR.trim()));
        assert!(prompt.contains(&format!("\"\"\"{}\"\"\"", question)));
        assert!(prompt.ends_with(&format!("{}\n", FOOTER)));
    }

    #[test]
    fn test_long_question_is_not_truncated() {
        let question = "entity ".repeat(2_000);
        let prompt = PromptBuilder::default().build(&question);
        assert!(prompt.contains(&question));
    }

    #[test]
    fn test_empty_question_still_builds() {
        let prompt = PromptBuilder::default().build("");
        assert!(prompt.contains("\"\"\"\"\"\""));
        assert!(prompt.contains("Database Schema:"));
    }

    #[test]
    fn test_examples_cover_query_patterns() {
        let examples = render_examples();
        assert!(examples.contains("WHERE"));
        assert!(examples.contains("GROUP BY"));
        assert!(examples.contains("JOIN page_entity_crosswalk"));
        assert!(examples.contains("WITH owners AS"));
        assert!(examples.contains("NOT EXISTS"));
        assert!(examples.contains("6) \""));
    }
}
