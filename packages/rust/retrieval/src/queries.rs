//! Natural-language questions sent to each knowledge base.
//!
//! A strategy means single-plan mode: questions are narrowed to that strategy.
//! Without one (batch mode) they ask for a neutral profile and for guidance on
//! choosing between the migration patterns.

use migrationplanner_shared::{KnowledgeSource, MigrationStrategy};

/// Question for `source` about `app_id`.
pub fn query_for(source: KnowledgeSource, app_id: &str, strategy: Option<&MigrationStrategy>) -> String {
    match source {
        KnowledgeSource::AppProfile => app_profile_query(app_id, strategy),
        KnowledgeSource::BestPractices => best_practices_query(strategy),
        KnowledgeSource::QandA => qanda_query(app_id),
    }
}

fn app_profile_query(app_id: &str, strategy: Option<&MigrationStrategy>) -> String {
    match strategy {
        Some(strategy) => format!(
            "Provide detailed information about application ID {app_id} relevant to migrating it to AWS \
             with the {strategy} strategy. Cover:\n\
             - Current architecture, server specifications (CPU, RAM, storage) and networking requirements\n\
             - Fit of the application for AWS compute services (EC2, ECS, EKS, Lambda)\n\
             - Recommended compute options and configurations\n\
             - Database engine, version and size, with suitable RDS instance types\n\
             - Ports, protocols and bandwidth needs\n\
             - Dependencies and third-party integrations\n\
             - Considerations specific to a {strategy} migration"
        ),
        None => format!(
            "Give a complete overview of application ID {app_id}: its description, business unit, \
             criticality and type. Describe its dependencies on other applications, the servers it runs \
             on and the databases it uses, calling out critical dependencies, the role of its server \
             infrastructure and the importance of its database connections."
        ),
    }
}

/// The best-practice question never mentions the application, so a batch can
/// ask it once and share the answer.
pub fn best_practices_query(strategy: Option<&MigrationStrategy>) -> String {
    match strategy {
        Some(strategy) => format!(
            "Provide detailed guidance on planning an application migration to AWS with the {strategy} \
             strategy. Include key considerations for moving compute, databases and storage under \
             {strategy}, the steps of the migration, and best practices for a smooth {strategy} transition."
        ),
        None => {
            let patterns = MigrationStrategy::PATTERNS
                .iter()
                .map(MigrationStrategy::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Recommend how to choose a migration strategy for an application moving to AWS. Weigh \
                 application complexity, coupling, performance and scalability needs, data dependencies \
                 and compliance requirements. Evaluate the suitability of each pattern ({patterns}), \
                 explain when a combination of patterns is appropriate, and cite the AWS Migration Lens \
                 and other relevant best practices."
            )
        }
    }
}

fn qanda_query(app_id: &str) -> String {
    format!(
        "List all information for application ID {app_id}, including every migration assessment \
         question and the application team's response. Format it as a structured list of questions \
         and answers."
    )
}
