//! Prompt construction.
//!
//! Both builders are pure template substitution over a [`ContextBundle`]: the
//! same bundle always yields the same prompt. Every prompt restates the
//! application id, embeds each retrieved fragment verbatim (empty fragments
//! included), and lists the exact sections the model must produce.

use std::fmt::Write as _;

use migrationplanner_sections::Section;
use migrationplanner_shared::{ContextBundle, MigrationStrategy};

/// One numbered part of a migration plan and the points it must cover.
struct PlanSection {
    title: &'static str,
    points: &'static [&'static str],
}

/// `{strategy}` in a point is replaced with the strategy name.
const PLAN_SECTIONS: &[PlanSection] = &[
    PlanSection {
        title: "Introduction",
        points: &[
            "- Overview of the application, its purpose and its current architecture",
            "- Detailed description of the target AWS architecture",
            "- Rationale for choosing the {strategy} migration strategy",
        ],
    },
    PlanSection {
        title: "Pre-Migration Activities",
        points: &[
            "- AWS account enrollment and setup with AWS Landing Zone or AWS Control Tower",
            "  - Step-by-step enrollment instructions",
            "  - Guidelines for separate development and production accounts",
            "- Application assessment and dependency analysis",
            "  - Every dependency, including third-party integrations and libraries",
            "  - Compatibility with AWS services and likely migration challenges",
            "- Data assessment and migration planning",
            "  - Data sources, volumes and formats",
            "  - Data migration plan, including required transformations",
            "- Licensing and compliance review",
            "  - Licensing model and its compliance on AWS",
            "  - Legal or regulatory requirements affecting the migration",
            "- Security planning",
            "  - Security controls to implement and best practices to follow",
            "  - Industry standards and regulations that apply (e.g. HIPAA, PCI-DSS)",
            "  - IAM roles and policies",
            "- Network and connectivity planning",
            "  - Target network architecture: VPC, subnets and security groups",
            "  - Connectivity between on-premises and AWS (e.g. VPN, AWS Direct Connect)",
            "- Migration tooling and environment setup",
            "  - AWS tools and services used for the migration (e.g. AWS MGN, AWS DMS)",
            "  - Step-by-step setup of the required AWS environments",
        ],
    },
    PlanSection {
        title: "Compute, Database, and Storage Migration",
        points: &[
            "- Compute migration",
            "  - Step-by-step plan, including AWS MGN or AWS App2Container where relevant",
            "  - Suitability of EC2, ECS, EKS and Lambda for this application",
            "  - Recommended compute options and configurations",
            "  - For EC2, instance types matched to performance and scalability needs",
            "  - For containers, containerization, orchestration and cluster configuration",
            "  - For Lambda, components suited to serverless and their function design and triggers",
            "- Database migration",
            "  - Process using AWS DMS or native database tooling",
            "  - Configuration of the target database (e.g. Amazon RDS, Amazon Aurora)",
            "  - RDS instance types mapped from the current database specifications",
            "  - Engine, version, size and performance requirements",
            "  - Required optimizations or schema changes",
            "- Storage migration",
            "  - Step-by-step plan using AWS DataSync or AWS Transfer Family",
            "  - Configuration and optimization of target storage (e.g. Amazon EFS, Amazon S3)",
            "  - Synchronization or replication requirements",
            "  - Storage options sized to current requirements and transfer considerations",
        ],
    },
    PlanSection {
        title: "Testing and Validation",
        points: &[
            "- Testing strategy covering functional, performance and user acceptance testing",
            "- Test cases and scenarios for each phase",
            "- Setup of test environments on AWS",
            "- Success and acceptance criteria for each phase",
        ],
    },
    PlanSection {
        title: "Monitoring, Logging, and Cost Optimization",
        points: &[
            "- Amazon CloudWatch monitoring and alerting",
            "- AWS CloudTrail for API activity auditing",
            "- Centralized logging",
            "- Right-sizing, AWS Cost Explorer and AWS Budgets",
            "- Cost-saving measures such as reserved instances, spot instances and auto-scaling",
        ],
    },
    PlanSection {
        title: "Disaster Recovery and Business Continuity",
        points: &[
            "- Highly available, fault-tolerant architecture",
            "- Backup and restore procedures",
            "- Disaster recovery plans and how they are tested",
        ],
    },
    PlanSection {
        title: "Cutover and Post-Migration",
        points: &[
            "- Cutover plan with timelines, communication and rollback procedures",
            "- Step-by-step cutover instructions",
            "- Post-migration monitoring, optimization and knowledge transfer",
            "- Decommissioning of the old environment",
        ],
    },
    PlanSection {
        title: "Stakeholder Communication and Collaboration",
        points: &[
            "- Key stakeholders and their roles",
            "- Communication channels and feedback loops",
            "- Regular status updates and progress reviews",
        ],
    },
    PlanSection {
        title: "Risk Assessment and Mitigation",
        points: &[
            "- Technical, operational and business risks of the migration",
            "- Mitigation for each identified risk",
            "- Contingency plan and detailed rollback procedures",
        ],
    },
    PlanSection {
        title: "Training and Continuous Optimization",
        points: &[
            "- Training plan covering AWS services, the architecture and the application",
            "- Schedule for training sessions and knowledge transfer",
            "- Process for continuous optimization and modernization after migration",
            "- Further AWS services and best practices worth adopting",
        ],
    },
];

/// Prompt asking for a full migration plan for `bundle.app_id` under `strategy`.
pub fn plan_prompt(bundle: &ContextBundle, strategy: &MigrationStrategy) -> String {
    let strategy = strategy.as_str();
    let mut out = String::new();

    let _ = write!(
        out,
        "Create a detailed migration plan for application ID {app_id} using the information below.\n\n\
         Application details:\n{profile}\n\n\
         Migration strategy: {strategy}\n\n\
         Migration guidance from AWS best-practice documentation:\n{guidance}\n\n\
         Application assessment data:\n{qanda}\n\n\
         Structure the plan with exactly these numbered sections:\n\n",
        app_id = bundle.app_id,
        profile = bundle.app_profile,
        guidance = bundle.best_practices,
        qanda = bundle.qanda,
    );

    for (index, section) in PLAN_SECTIONS.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, section.title);
        for point in section.points {
            let _ = writeln!(out, "   {}", point.replace("{strategy}", strategy));
        }
        out.push('\n');
    }

    out.push_str(
        "Make the plan well structured and actionable, with specific instructions for every \
         phase. Keep formatting and terminology consistent throughout.",
    );
    out
}

/// What the model should write under each recommendation header.
fn section_guidance(section: Section) -> &'static str {
    match section {
        Section::Patterns => {
            "The three most suitable migration patterns with a percentage weight for each, \
             e.g. Refactor-70%, Replatform-20%, Rehost-10%."
        }
        Section::Justification => {
            "For each recommended pattern, why it suits this application: its characteristics, \
             requirements and goals, weighing complexity, time to migrate, cost and optimization. \
             Cite the specific data below that supports the choice."
        }
        Section::Architecture => {
            "For each recommended pattern, a high-level target AWS architecture: the key \
             services, components and architectural patterns."
        }
        Section::Cost => {
            "For each recommended pattern, a cost breakdown per AWS resource with its pricing \
             model (hourly, monthly, data transfer) and estimated cost, followed by the total \
             estimated cost of that pattern's architecture."
        }
    }
}

/// Prompt asking which migration patterns fit `bundle.app_id`.
///
/// The answer is expected under the four [`Section`] headers, verbatim, so that
/// it can be split with `parse_recommendation`.
pub fn recommendation_prompt(bundle: &ContextBundle) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "As an AWS migration expert, analyze the migration readiness data for application ID {} \
         and recommend the most suitable patterns for migrating it to AWS. Consider these patterns:",
        bundle.app_id
    );
    for pattern in MigrationStrategy::PATTERNS.iter() {
        let _ = writeln!(out, "- {pattern}");
    }

    let _ = write!(
        out,
        "\nRelevant migration best practices:\n{guidance}\n\n\
         Application-specific information:\n{profile}\n\n\
         Application Q&A information:\n{qanda}\n\n\
         Base every recommendation on the information above. Where a recommendation relies on an \
         assumption or on information not present in the data, say so. If more information is \
         needed for an accurate recommendation, state exactly what.\n\n\
         Answer using exactly these four headers, each on its own line and in this order:\n\n",
        guidance = bundle.best_practices,
        profile = bundle.app_profile,
        qanda = bundle.qanda,
    );

    for section in Section::ALL {
        let _ = writeln!(out, "{} [{}]", section.header(), section_guidance(section));
    }

    out.push_str(
        "\nUse clear, well-structured formatting with bullet points or numbering where it helps \
         readability.",
    );
    out
}
