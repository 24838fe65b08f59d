//! Curated policy notes, looked up by keyword.

use serde::Serialize;

/// One curated policy note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodexEntry {
    pub topic: &'static str,
    pub keywords: &'static [&'static str],
    pub text: &'static str,
    pub source: &'static str,
}

impl CodexEntry {
    /// Keyword containment, ignoring case.
    pub fn matches(&self, question_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| question_lower.contains(&keyword.to_lowercase()))
    }
}

pub static POLICY_CODEX: &[CodexEntry] = &[
    CodexEntry {
        topic: "Medical Debt Limit",
        keywords: &["medical debt", "25%", "medical limit"],
        text: "Medical debt must not exceed 25% of the total enrolled debt.",
        source: "ELEVATE_FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Program Length",
        keywords: &["program length", "max months", "duration", "program months"],
        text: "Program length depends on enrolled debt. Ranges from 24 to 60 months depending on tier.",
        source: "ELEVATE_FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Rev Share States",
        keywords: &["rev share", "revenue share", "restricted state"],
        text: "Certain states are Rev Share restricted and handled differently. See eligibility rules per state.",
        source: "State List_v06.01.25",
    },
    CodexEntry {
        topic: "Debt Type Eligibility",
        keywords: &["unsecured debt", "enrollable debt", "acceptable accounts"],
        text: "Only unsecured debts such as credit cards, personal loans, and some medical collections are enrollable. Accounts must be in the client's name.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Creditor Minimum Balance",
        keywords: &["minimum creditor", "$500", "minimum balance per creditor"],
        text: "Each individual creditor must have at least $500 in outstanding balance to be included.",
        source: "ELEVATE_FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Federal Loan Exclusion",
        keywords: &["federal loan", "student loan", "government debt"],
        text: "Federal student loans and other government-backed obligations are not eligible.",
        source: "Debt_Program_Comparison_Table",
    },
    CodexEntry {
        topic: "High Balance Approval",
        keywords: &["$150k", "high debt", "manager approval"],
        text: "Enrollment amounts above $150,000 may require manager or compliance review.",
        source: "ELEVATE_FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Cash Advance / Balance Transfers",
        keywords: &["cash advance", "balance transfer"],
        text: "Accounts originating from cash advances or balance transfers are reviewed case-by-case.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Military Waiver",
        keywords: &["military", "military ID", "active duty", "clearance"],
        text: "Military clients may need special waiver documentation depending on their active duty or clearance status.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Auto Loan Charge-Offs",
        keywords: &["repo", "repossession", "auto charge-off"],
        text: "Auto loans that are charged-off or repossessed may require a deficiency letter before enrollment.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Collections Criteria",
        keywords: &["collections", "third party collector", "account number shown"],
        text: "Collections are only acceptable if handled by a third-party collector and account number is visible on documentation.",
        source: "ELEVATE_FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "ACH Requirement",
        keywords: &["ACH", "bank draft", "auto draft"],
        text: "Clients must enroll with ACH auto-draft from a valid U.S. checking account.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Minimum Monthly Payment",
        keywords: &["monthly payment", "minimum payment", "payment amount"],
        text: "Minimum monthly payment depends on debt load. For example, $310 for $10k–$20k, $350 for $20k–$30k.",
        source: "ELEVATE_FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "First Payment Date",
        keywords: &["first payment", "initial payment", "payment window"],
        text: "First payment must be scheduled between 7 and 30 days from submission. CA clients must start within 10 days.",
        source: "ELEVATE_FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Royal Prestige",
        keywords: &["royal prestige"],
        text: "Royal Prestige is listed as a creditor. Please confirm specific eligibility with policy guidelines.",
        source: "Both Elevate and Clarity",
    },
    CodexEntry {
        topic: "Cooperative Credit Union",
        keywords: &["credit union", "cooperative account"],
        text: "If the creditor is a credit union, client must close checking/savings within 30 days or risks freezing.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Client Contact",
        keywords: &["support contact", "client service", "phone number"],
        text: "For enrollment or eligibility questions, call 561-763-8380 or email csd@myclientservice.com.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Spanish Language Support",
        keywords: &["spanish", "español", "language"],
        text: "Bot supports dual-language responses for English and Spanish questions.",
        source: "System Design",
    },
    CodexEntry {
        topic: "Program Eligibility",
        keywords: &["program eligibility", "qualify", "enrollment requirement"],
        text: "Program eligibility depends on debt type, amount, state, and payment ability.",
        source: "Debt_Program_Comparison_Table",
    },
    CodexEntry {
        topic: "One-Creditor Rule",
        keywords: &["one creditor", "one account", "1 creditor"],
        text: "Clients with only one account may not be eligible unless exceptions apply.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Clarity Minimums",
        keywords: &["minimum account", "minimum per creditor", "$250", "small balances"],
        text: "Each unsecured debt must be at least $250. Debts under this threshold are not allowed, even if combined.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Clarity DTI and Credit Score",
        keywords: &["dti", "credit score", "advance payout"],
        text: "Clients must have a DTI between 60–100% and a credit score of at least 500 to qualify for the Advance Payout Model.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Clarity High-Risk Lenders",
        keywords: &["accion usa", "goodelap", "loanosity", "tower loans", "webbank"],
        text: "Accion USA, GoodLeap, Loanosity, and many others are explicitly rejected even if in collections. See High-Risk Lender list for complete exclusions.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Clarity Credit Union Closure",
        keywords: &["credit union", "offset", "freeze", "close account"],
        text: "Clients must close credit union checking/savings accounts within 30 days or risk account freezing due to cross-collateralization.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Clarity Acceptable Debts",
        keywords: &["acceptable debts", "credit cards", "repossession"],
        text: "Accepted: credit cards, collection accounts, repossessed auto deficiencies, medical collections (with proof), and private student loans. Must follow documentation rules.",
        source: "Affiliate_Training_Packet_2025_OCR_Text",
    },
    CodexEntry {
        topic: "Elevate Discover/AMEX Limit",
        keywords: &["discover", "american express", "70% limit"],
        text: "Discover and/or AMEX accounts must be less than 70% of total enrolled debt. Single-account files from either are not eligible.",
        source: "ELEVATE_ FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Oportun Eligibility",
        keywords: &["oportun", "opp loan", "oportun card"],
        text: "Oportun loans are accepted only if under 25% of the total debt. If client resides in California, Oportun debts are NOT allowed at all.",
        source: "ELEVATE_ FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Repo Documentation Requirement",
        keywords: &["repossession", "deficiency", "repo letter"],
        text: "Repo balances require documentation within 14 days: repossession letter, deficiency letter, or signed client statement.",
        source: "ELEVATE_ FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Elevate Credit Union Risk",
        keywords: &["cross collateral", "credit union", "checking", "savings"],
        text: "Clients using a credit union for deposits must change accounts within 30–60 days due to asset freeze risk. Cannot have any other secured account with that credit union.",
        source: "ELEVATE_ FORTH Enrollment Criteria",
    },
    CodexEntry {
        topic: "Elevate Business Debt",
        keywords: &["business debt", "EIN", "personal guarantee"],
        text: "Business debts must be closed, and preferably under a personal guarantee. Requires dissolution proof or verbal recording.",
        source: "ELEVATE_ FORTH Enrollment Criteria",
    },
];

/// Codex entries with any keyword in the question, in codex order.
pub fn search_codex(question: &str) -> Vec<&'static CodexEntry> {
    let question = question.to_lowercase();
    POLICY_CODEX
        .iter()
        .filter(|entry| entry.matches(&question))
        .collect()
}
