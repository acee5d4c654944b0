pub mod domain;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use uuid::Uuid;

    const REQUIRED_VARS: [&str; 5] = [
        "NOTION_API_KEY",
        "GEMINI_API_KEY",
        "NOTION_DATABASE_ID",
        "NOTION_FEEDBACK_DB_ID",
        "NOTION_REPORT_DB_ID",
    ];

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub notion_api_key: Option<String>,
        pub gemini_api_key: Option<String>,
        pub notion_database_id: Option<String>,
        pub notion_feedback_db_id: Option<String>,
        pub notion_report_db_id: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    /// The three Notion databases the pipeline reads and writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DatabaseIds {
        /// Published analysis records.
        pub analysis: Uuid,
        /// Daily verdict records.
        pub feedback: Uuid,
        /// Weekly summary records.
        pub report: Uuid,
    }

    impl DatabaseIds {
        pub fn named(&self) -> [(&'static str, Uuid); 3] {
            [
                ("analysis", self.analysis),
                ("feedback", self.feedback),
                ("report", self.report),
            ]
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                notion_api_key: non_blank_var("NOTION_API_KEY"),
                gemini_api_key: non_blank_var("GEMINI_API_KEY"),
                notion_database_id: non_blank_var("NOTION_DATABASE_ID"),
                notion_feedback_db_id: non_blank_var("NOTION_FEEDBACK_DB_ID"),
                notion_report_db_id: non_blank_var("NOTION_REPORT_DB_ID"),
                sentry_dsn: non_blank_var("SENTRY_DSN"),
            })
        }

        /// Fails listing every missing variable, before any client is built.
        pub fn require_all(&self) -> anyhow::Result<()> {
            let values = [
                &self.notion_api_key,
                &self.gemini_api_key,
                &self.notion_database_id,
                &self.notion_feedback_db_id,
                &self.notion_report_db_id,
            ];
            let missing: Vec<&str> = REQUIRED_VARS
                .iter()
                .zip(values)
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| *name)
                .collect();

            anyhow::ensure!(
                missing.is_empty(),
                "missing required environment variables: {}",
                missing.join(", ")
            );
            Ok(())
        }

        pub fn require_notion_api_key(&self) -> anyhow::Result<&str> {
            self.notion_api_key
                .as_deref()
                .context("NOTION_API_KEY is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn require_database_ids(&self) -> anyhow::Result<DatabaseIds> {
            Ok(DatabaseIds {
                analysis: parse_database_id("NOTION_DATABASE_ID", &self.notion_database_id)?,
                feedback: parse_database_id("NOTION_FEEDBACK_DB_ID", &self.notion_feedback_db_id)?,
                report: parse_database_id("NOTION_REPORT_DB_ID", &self.notion_report_db_id)?,
            })
        }
    }

    fn non_blank_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    // Notion shows ids without hyphens in share links; Uuid accepts both forms.
    fn parse_database_id(key: &str, value: &Option<String>) -> anyhow::Result<Uuid> {
        let raw = value
            .as_deref()
            .with_context(|| format!("{key} is required"))?;
        Uuid::parse_str(raw).with_context(|| format!("{key} is not a valid Notion database id: {raw}"))
    }

}
