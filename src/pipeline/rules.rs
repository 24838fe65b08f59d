//! Pre-retrieval rule lookup for named creditors and debt types.
//!
//! Runs before any embedding or LLM call:
//! - Hard rule table: fixed bilingual answers per creditor/debt type,
//!   optionally conditioned on a state named in the question.
//! - Global disqualification list: creditors rejected outright.
//!
//! If the rule book returns a `RuleDecision`, retrieval is skipped entirely.

use regex::Regex;
use tracing::debug;

/// When a hard rule outcome applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    /// Always applies.
    Global,
    /// Applies when the question names the state or its postal code.
    State {
        name: &'static str,
        abbreviation: &'static str,
    },
}

impl RuleCondition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::State { name, .. } => name,
        }
    }
}

/// One conditional outcome with its fixed answer pair.
#[derive(Debug)]
pub struct RuleOutcome {
    pub condition: RuleCondition,
    pub english: &'static str,
    pub spanish: &'static str,
}

/// A creditor or debt-type keyword with its outcomes in priority order.
#[derive(Debug)]
pub struct HardRule {
    pub key: &'static str,
    pub outcomes: &'static [RuleOutcome],
}

/// What the rule book decided for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleDecision {
    /// Fixed bilingual answer from the hard rule table.
    HardRule {
        key: &'static str,
        condition: RuleCondition,
        english: &'static str,
        spanish: &'static str,
    },
    /// Creditor on the global disqualification list.
    Disqualified { keyword: &'static str },
}

const CALIFORNIA: RuleCondition = RuleCondition::State {
    name: "california",
    abbreviation: "ca",
};

/// English answer for globally disqualified creditors. The Spanish half is
/// produced by translation.
pub const DISQUALIFIED_ENGLISH: &str = "❌ *Elevate:* This creditor is disqualified and not eligible under any circumstances.\n\
❌ *Clarity:* This creditor is disqualified based on policy documents.\n\
📝 *Please advise the client to resolve this debt outside the program.*";

macro_rules! global_rule {
    ($key:literal, $en:literal, $es:literal) => {
        HardRule {
            key: $key,
            outcomes: &[RuleOutcome {
                condition: RuleCondition::Global,
                english: $en,
                spanish: $es,
            }],
        }
    };
}

/// Hard rule table. Order matters: the first matching key wins.
pub static HARD_RULES: &[HardRule] = &[
    // Debt types
    global_rule!(
        "mortgage",
        "❌ *Elevate:* Mortgage loans are not accepted.\n❌ *Clarity:* Mortgage loans are not accepted.\n📝 *Please inform the client that mortgage loans must be resolved outside the program.*",
        "❌ *Elevate:* Los préstamos hipotecarios no se aceptan.\n❌ *Clarity:* Los préstamos hipotecarios no se aceptan.\n📝 *Por favor informe al cliente que los préstamos hipotecarios deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "secured loan",
        "❌ *Elevate:* Secured loans are not accepted.\n❌ *Clarity:* Secured loans are not accepted.\n📝 *Please inform the client that secured loans must be resolved outside the program.*",
        "❌ *Elevate:* Los préstamos con garantía no se aceptan.\n❌ *Clarity:* Los préstamos con garantía no se aceptan.\n📝 *Por favor informe al cliente que los préstamos con garantía deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "federal student loan",
        "❌ *Elevate:* Federal student loans are not accepted.\n❌ *Clarity:* Federal student loans are not accepted.\n📝 *Please inform the client that federal student loans must be resolved outside the program.*",
        "❌ *Elevate:* Los préstamos estudiantiles federales no se aceptan.\n❌ *Clarity:* Los préstamos estudiantiles federales no se aceptan.\n📝 *Por favor informe al cliente que los préstamos estudiantiles federales deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "auto loan",
        "❌ *Elevate:* Auto loans are not accepted.\n❌ *Clarity:* Auto loans are not accepted (except post-repossession deficiencies).\n📝 *Please inform the client that auto loans must be resolved outside the program.*",
        "❌ *Elevate:* Los préstamos de auto no se aceptan.\n❌ *Clarity:* Los préstamos de auto no se aceptan (excepto deficiencias post-embargo).\n📝 *Por favor informe al cliente que los préstamos de auto deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "irs",
        "❌ *Elevate:* IRS/tax debt is not accepted.\n❌ *Clarity:* IRS/tax debt is not accepted.\n📝 *Please inform the client that IRS/tax debt must be resolved outside the program.*",
        "❌ *Elevate:* La deuda del IRS/impuestos no se acepta.\n❌ *Clarity:* La deuda del IRS/impuestos no se acepta.\n📝 *Por favor informe al cliente que la deuda del IRS/impuestos debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "judgment",
        "❌ *Elevate:* Judgments are not accepted.\n❌ *Clarity:* Judgments are not accepted (unless filed 6+ months ago with no active collection).\n📝 *Please inform the client that judgments must be resolved outside the program.*",
        "❌ *Elevate:* Los juicios no se aceptan.\n❌ *Clarity:* Los juicios no se aceptan (a menos que se presentaron hace 6+ meses sin cobro activo).\n📝 *Por favor informe al cliente que los juicios deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "alimony",
        "❌ *Elevate:* Alimony/child support is not accepted.\n❌ *Clarity:* Alimony/child support is not accepted.\n📝 *Please inform the client that alimony/child support must be resolved outside the program.*",
        "❌ *Elevate:* La pensión alimenticia no se acepta.\n❌ *Clarity:* La pensión alimenticia no se acepta.\n📝 *Por favor informe al cliente que la pensión alimenticia debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "gambling",
        "❌ *Elevate:* Gambling debts are not accepted.\n❌ *Clarity:* Gambling debts are not accepted.\n📝 *Please inform the client that gambling debts must be resolved outside the program.*",
        "❌ *Elevate:* Las deudas de juego no se aceptan.\n❌ *Clarity:* Las deudas de juego no se aceptan.\n📝 *Por favor informe al cliente que las deudas de juego deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "timeshare",
        "❌ *Elevate:* Timeshares are not accepted.\n❌ *Clarity:* Timeshares are not accepted.\n📝 *Please inform the client that timeshares must be resolved outside the program.*",
        "❌ *Elevate:* Los tiempos compartidos no se aceptan.\n❌ *Clarity:* Los tiempos compartidos no se aceptan.\n📝 *Por favor informe al cliente que los tiempos compartidos deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "property tax",
        "❌ *Elevate:* Property taxes are not accepted.\n❌ *Clarity:* Property taxes are not accepted.\n📝 *Please inform the client that property taxes must be resolved outside the program.*",
        "❌ *Elevate:* Los impuestos sobre la propiedad no se aceptan.\n❌ *Clarity:* Los impuestos sobre la propiedad no se aceptan.\n📝 *Por favor informe al cliente que los impuestos sobre la propiedad deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "bail bond",
        "❌ *Elevate:* Bail bonds are not accepted.\n❌ *Clarity:* Bail bonds are not accepted.\n📝 *Please inform the client that bail bonds must be resolved outside the program.*",
        "❌ *Elevate:* Las fianzas no se aceptan.\n❌ *Clarity:* Las fianzas no se aceptan.\n📝 *Por favor informe al cliente que las fianzas deben resolverse fuera del programa.*"
    ),
    // Specific creditors
    global_rule!(
        "ncb",
        "❌ *Elevate:* NCB Management Services is not accepted.\n❌ *Clarity:* NCB Management Services is not accepted.\n📝 *Please inform the client that NCB debts must be resolved outside the program.*",
        "❌ *Elevate:* NCB Management Services no se acepta.\n❌ *Clarity:* NCB Management Services no se acepta.\n📝 *Por favor informe al cliente que las deudas de NCB deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "rocket loan",
        "❌ *Elevate:* Rocket Loans is not accepted.\n❌ *Clarity:* Rocket Loans is not accepted.\n📝 *Please inform the client that Rocket Loans must be resolved outside the program.*",
        "❌ *Elevate:* Rocket Loans no se acepta.\n❌ *Clarity:* Rocket Loans no se acepta.\n📝 *Por favor informe al cliente que Rocket Loans debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "goodleap",
        "❌ *Elevate:* GoodLeap is not accepted.\n❌ *Clarity:* GoodLeap is not accepted.\n📝 *Please inform the client that GoodLeap must be resolved outside the program.*",
        "❌ *Elevate:* GoodLeap no se acepta.\n❌ *Clarity:* GoodLeap no se acepta.\n📝 *Por favor informe al cliente que GoodLeap debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "military star",
        "❌ *Elevate:* Military Star is not accepted.\n❌ *Clarity:* Military Star is not accepted.\n📝 *Please inform the client that Military Star must be resolved outside the program.*",
        "❌ *Elevate:* Military Star no se acepta.\n❌ *Clarity:* Military Star no se acepta.\n📝 *Por favor informe al cliente que Military Star debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "tower loan",
        "❌ *Elevate:* Tower Loan is not accepted.\n❌ *Clarity:* Tower Loan is not accepted.\n📝 *Please inform the client that Tower Loan must be resolved outside the program.*",
        "❌ *Elevate:* Tower Loan no se acepta.\n❌ *Clarity:* Tower Loan no se acepta.\n📝 *Por favor informe al cliente que Tower Loan debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "aqua finance",
        "❌ *Elevate:* Aqua Finance is not accepted.\n❌ *Clarity:* Aqua Finance is not accepted.\n📝 *Please inform the client that Aqua Finance must be resolved outside the program.*",
        "❌ *Elevate:* Aqua Finance no se acepta.\n❌ *Clarity:* Aqua Finance no se acepta.\n📝 *Por favor informe al cliente que Aqua Finance debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "pentagon",
        "❌ *Elevate:* Pentagon FCU installment loans are not accepted (credit cards only).\n❌ *Clarity:* Pentagon FCU installment loans are not accepted.\n📝 *Please inform the client that Pentagon FCU installment loans must be resolved outside the program.*",
        "❌ *Elevate:* Los préstamos a plazos de Pentagon FCU no se aceptan (solo tarjetas de crédito).\n❌ *Clarity:* Los préstamos a plazos de Pentagon FCU no se aceptan.\n📝 *Por favor informe al cliente que los préstamos a plazos de Pentagon FCU deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "koalafi",
        "❌ *Elevate:* KOALAFI is not accepted.\n❌ *Clarity:* KOALAFI is not accepted.\n📝 *Please inform the client that KOALAFI must be resolved outside the program.*",
        "❌ *Elevate:* KOALAFI no se acepta.\n❌ *Clarity:* KOALAFI no se acepta.\n📝 *Por favor informe al cliente que KOALAFI debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "republic finance",
        "❌ *Elevate:* Republic Finance is not accepted.\n❌ *Clarity:* Republic Finance is not accepted.\n📝 *Please inform the client that Republic Finance must be resolved outside the program.*",
        "❌ *Elevate:* Republic Finance no se acepta.\n❌ *Clarity:* Republic Finance no se acepta.\n📝 *Por favor informe al cliente que Republic Finance debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "snap tools",
        "❌ *Elevate:* Snap Tools is not accepted.\n❌ *Clarity:* Snap Tools is not accepted.\n📝 *Please inform the client that Snap Tools must be resolved outside the program.*",
        "❌ *Elevate:* Snap Tools no se acepta.\n❌ *Clarity:* Snap Tools no se acepta.\n📝 *Por favor informe al cliente que Snap Tools debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "cnh",
        "❌ *Elevate:* CNH Industrial is not accepted.\n❌ *Clarity:* CNH Industrial is not accepted.\n📝 *Please inform the client that CNH Industrial must be resolved outside the program.*",
        "❌ *Elevate:* CNH Industrial no se acepta.\n❌ *Clarity:* CNH Industrial no se acepta.\n📝 *Por favor informe al cliente que CNH Industrial debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "duvera",
        "❌ *Elevate:* Duvera Finance is not accepted.\n❌ *Clarity:* Duvera Finance is not accepted.\n📝 *Please inform the client that Duvera Finance must be resolved outside the program.*",
        "❌ *Elevate:* Duvera Finance no se acepta.\n❌ *Clarity:* Duvera Finance no se acepta.\n📝 *Por favor informe al cliente que Duvera Finance debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "grt american",
        "❌ *Elevate:* GRT American Financial is not accepted.\n❌ *Clarity:* GRT American Financial is not accepted.\n📝 *Please inform the client that GRT American Financial must be resolved outside the program.*",
        "❌ *Elevate:* GRT American Financial no se acepta.\n❌ *Clarity:* GRT American Financial no se acepta.\n📝 *Por favor informe al cliente que GRT American Financial debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "service finance",
        "❌ *Elevate:* Service Finance is not accepted.\n❌ *Clarity:* Service Finance is not accepted.\n📝 *Please inform the client that Service Finance must be resolved outside the program.*",
        "❌ *Elevate:* Service Finance no se acepta.\n❌ *Clarity:* Service Finance no se acepta.\n📝 *Por favor informe al cliente que Service Finance debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "schools first",
        "❌ *Elevate:* Schools First CU loans are not accepted (credit cards only).\n❌ *Clarity:* Schools First CU loans are not accepted.\n📝 *Please inform the client that Schools First CU loans must be resolved outside the program.*",
        "❌ *Elevate:* Los préstamos de Schools First CU no se aceptan (solo tarjetas de crédito).\n❌ *Clarity:* Los préstamos de Schools First CU no se aceptan.\n📝 *Por favor informe al cliente que los préstamos de Schools First CU deben resolverse fuera del programa.*"
    ),
    global_rule!(
        "nebraska furniture",
        "❌ *Elevate:* Nebraska Furniture is not accepted.\n❌ *Clarity:* Nebraska Furniture is not accepted.\n📝 *Please inform the client that Nebraska Furniture must be resolved outside the program.*",
        "❌ *Elevate:* Nebraska Furniture no se acepta.\n❌ *Clarity:* Nebraska Furniture no se acepta.\n📝 *Por favor informe al cliente que Nebraska Furniture debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "aaron",
        "❌ *Elevate:* Aaron's Rent is not accepted.\n❌ *Clarity:* Aaron's Rent is not accepted.\n📝 *Please inform the client that Aaron's Rent must be resolved outside the program.*",
        "❌ *Elevate:* Aaron's Rent no se acepta.\n❌ *Clarity:* Aaron's Rent no se acepta.\n📝 *Por favor informe al cliente que Aaron's Rent debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "sofi",
        "❌ *Elevate:* SoFi is not accepted if federally backed.\n❌ *Clarity:* SoFi is not accepted if federally backed.\n📝 *Please inform the client that SoFi must be resolved outside the program.*",
        "❌ *Elevate:* SoFi no se acepta si está respaldado federalmente.\n❌ *Clarity:* SoFi no se acepta si está respaldado federalmente.\n📝 *Por favor informe al cliente que SoFi debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "rc willey",
        "❌ *Elevate:* RC Willey is not accepted.\n❌ *Clarity:* RC Willey is not accepted.\n📝 *Please inform the client that RC Willey must be resolved outside the program.*",
        "❌ *Elevate:* RC Willey no se acepta.\n❌ *Clarity:* RC Willey no se acepta.\n📝 *Por favor informe al cliente que RC Willey debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "fortiva",
        "❌ *Elevate:* Fortiva is not accepted.\n❌ *Clarity:* Fortiva is not accepted.\n📝 *Please inform the client that Fortiva must be resolved outside the program.*",
        "❌ *Elevate:* Fortiva no se acepta.\n❌ *Clarity:* Fortiva no se acepta.\n📝 *Por favor informe al cliente que Fortiva debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "omni financial",
        "❌ *Elevate:* OMNI Financial is not accepted.\n❌ *Clarity:* OMNI Financial is not accepted.\n📝 *Please inform the client that OMNI Financial must be resolved outside the program.*",
        "❌ *Elevate:* OMNI Financial no se acepta.\n❌ *Clarity:* OMNI Financial no se acepta.\n📝 *Por favor informe al cliente que OMNI Financial debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "srvfinco",
        "❌ *Elevate:* SRVFINCO is not accepted.\n❌ *Clarity:* SRVFINCO is not accepted.\n📝 *Please inform the client that SRVFINCO must be resolved outside the program.*",
        "❌ *Elevate:* SRVFINCO no se acepta.\n❌ *Clarity:* SRVFINCO no se acepta.\n📝 *Por favor informe al cliente que SRVFINCO debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "bhg",
        "❌ *Elevate:* BHG Bankers Healthcare Group is not accepted.\n❌ *Clarity:* BHG Bankers Healthcare Group is not accepted.\n📝 *Please inform the client that BHG must be resolved outside the program.*",
        "❌ *Elevate:* BHG Bankers Healthcare Group no se acepta.\n❌ *Clarity:* BHG Bankers Healthcare Group no se acepta.\n📝 *Por favor informe al cliente que BHG debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "mariner finance",
        "❌ *Elevate:* Mariner Finance is not accepted.\n❌ *Clarity:* Mariner Finance is not accepted.\n📝 *Please inform the client that Mariner Finance must be resolved outside the program.*",
        "❌ *Elevate:* Mariner Finance no se acepta.\n❌ *Clarity:* Mariner Finance no se acepta.\n📝 *Por favor informe al cliente que Mariner Finance debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "security finance",
        "❌ *Elevate:* Security Finance is not accepted.\n❌ *Clarity:* Security Finance is not accepted.\n📝 *Please inform the client that Security Finance must be resolved outside the program.*",
        "❌ *Elevate:* Security Finance no se acepta.\n❌ *Clarity:* Security Finance no se acepta.\n📝 *Por favor informe al cliente que Security Finance debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "pioneer credit",
        "❌ *Elevate:* Pioneer Credit is not accepted.\n❌ *Clarity:* Pioneer Credit is not accepted.\n📝 *Please inform the client that Pioneer Credit must be resolved outside the program.*",
        "❌ *Elevate:* Pioneer Credit no se acepta.\n❌ *Clarity:* Pioneer Credit no se acepta.\n📝 *Por favor informe al cliente que Pioneer Credit debe resolverse fuera del programa.*"
    ),
    global_rule!(
        "world finance",
        "❌ *Elevate:* World Finance is not accepted.\n❌ *Clarity:* World Finance is not accepted.\n📝 *Please inform the client that World Finance must be resolved outside the program.*",
        "❌ *Elevate:* World Finance no se acepta.\n❌ *Clarity:* World Finance no se acepta.\n📝 *Por favor informe al cliente que World Finance debe resolverse fuera del programa.*"
    ),
    // Conditional acceptance
    HardRule {
        key: "oportun",
        outcomes: &[
            RuleOutcome {
                condition: CALIFORNIA,
                english: "❌ *Elevate:* Oportun is not accepted in California.\n❌ *Clarity:* Oportun is not accepted in California.\n📝 *Please inform the client that this debt must be resolved outside the program.*",
                spanish: "❌ *Elevate:* Oportun no se acepta en California.\n❌ *Clarity:* Oportun no se acepta en California.\n📝 *Por favor informe al cliente que esta deuda debe resolverse fuera del programa.*",
            },
            RuleOutcome {
                condition: RuleCondition::Global,
                english: "✅ *Elevate:* Oportun is accepted (max 25% of total debt).\n✅ *Clarity:* Oportun is accepted (no cap stated).\n📝 *Please ensure client meets all other program criteria.*",
                spanish: "✅ *Elevate:* Oportun se acepta (máx 25% de la deuda total).\n✅ *Clarity:* Oportun se acepta (sin límite establecido).\n📝 *Por favor asegúrese de que el cliente cumpla con todos los demás criterios del programa.*",
            },
        ],
    },
    global_rule!(
        "regional finance",
        "❌ *Elevate:* Regional Finance is not accepted.\n✅ *Clarity:* Regional Finance is accepted if unsecured and meets standard criteria.\n📝 *Please check specific program requirements.*",
        "❌ *Elevate:* Regional Finance no se acepta.\n✅ *Clarity:* Regional Finance se acepta si es sin garantía y cumple con los criterios estándar.\n📝 *Por favor verifique los requisitos específicos del programa.*"
    ),
];

/// Creditors rejected under any circumstance.
pub static DISQUALIFIED_CREDITORS: &[&str] = &[
    "accion usa",
    "diamond resorts",
    "cashnetusa",
    "advance financial",
    "armed forces bank",
    "army navy exchange",
    "ashley furniture",
    "avio credit",
    "b&f finance",
    "bannerbank",
    "blue green corp",
    "cc flow",
    "christianccu",
    "commonwealth cu",
    "conns credit",
    "cornwell tools",
    "credit america",
    "crest financial",
    "duvera finance",
    "educators cu",
    "enerbank",
    "founders fcu",
    "future income payments",
    "gecrb",
    "intermountain healthcare",
    "ispc",
    "john deere",
    "karrot loans",
    "lending usa",
    "lendmark",
    "loanmart",
    "loanosity",
    "mac credit",
    "mahindra finance",
    "mcservices",
    "monterey collections",
    "nasa fcu",
    "new credit america",
    "orange lake",
    "paramount",
    "payday loans",
    "qualstar cu",
    "schewels furniture",
    "snap tools",
    "spteachercu",
    "starwood vacation",
    "superior financial group",
    "teachers cu",
    "tempoe llc",
    "texans credit corp",
    "time investments",
    "tribal loans",
    "tsi trans world systems",
    "veridian credit union",
    "virginia cu",
    "webbank",
    "welk resort group",
    "wf/bobsfurniture",
    "wilshire commercial",
    "wilson b&t",
    "world acceptance corporation",
];

/// A hard rule with its keyword and state patterns compiled.
struct CompiledRule {
    keyword: Regex,
    rule: &'static HardRule,
    /// One entry per outcome; `None` for `Global`.
    states: Vec<Option<Regex>>,
}

impl CompiledRule {
    fn new(rule: &'static HardRule) -> Self {
        Self {
            keyword: keyword_regex(rule.key),
            rule,
            states: rule
                .outcomes
                .iter()
                .map(|outcome| state_regex(outcome.condition))
                .collect(),
        }
    }

    fn first_outcome(&self, question: &str) -> Option<&'static RuleOutcome> {
        self.rule
            .outcomes
            .iter()
            .zip(&self.states)
            .find(|(_, state)| state.as_ref().is_none_or(|re| re.is_match(question)))
            .map(|(outcome, _)| outcome)
    }
}

/// Compiled rule book.
///
/// Keywords match at a word start, so `irs` does not fire on "first" and
/// `secured loan` does not fire on "unsecured loan", while plurals still hit.
/// Plain substring containment would fire in both of those cases.
pub struct RuleBook {
    hard_rules: Vec<CompiledRule>,
    disqualified: Vec<(Regex, &'static str)>,
}

impl RuleBook {
    /// Rule book over the built-in tables.
    pub fn standard() -> Self {
        Self::new(HARD_RULES, DISQUALIFIED_CREDITORS)
    }

    pub fn new(hard_rules: &'static [HardRule], disqualified: &'static [&'static str]) -> Self {
        Self {
            hard_rules: hard_rules.iter().map(CompiledRule::new).collect(),
            disqualified: disqualified
                .iter()
                .map(|keyword| (keyword_regex(keyword), *keyword))
                .collect(),
        }
    }

    /// Evaluate a lowercased question. `None` means fall through to retrieval.
    pub fn evaluate(&self, question: &str) -> Option<RuleDecision> {
        for compiled in &self.hard_rules {
            if !compiled.keyword.is_match(question) {
                continue;
            }
            let rule = compiled.rule;
            debug!(key = rule.key, "Hard rule keyword matched");

            match compiled.first_outcome(question) {
                Some(outcome) => {
                    debug!(
                        key = rule.key,
                        condition = outcome.condition.label(),
                        "Hard rule triggered"
                    );
                    return Some(RuleDecision::HardRule {
                        key: rule.key,
                        condition: outcome.condition,
                        english: outcome.english,
                        spanish: outcome.spanish,
                    });
                }
                None => {
                    debug!(key = rule.key, "No hard rule condition held, continuing");
                }
            }
        }

        self.disqualified
            .iter()
            .find(|(regex, _)| regex.is_match(question))
            .map(|(_, keyword)| {
                debug!(keyword = *keyword, "Globally disqualified creditor");
                RuleDecision::Disqualified { keyword }
            })
    }

    pub fn hard_rule_count(&self) -> usize {
        self.hard_rules.len()
    }

    pub fn disqualified_count(&self) -> usize {
        self.disqualified.len()
    }
}

fn keyword_regex(keyword: &str) -> Regex {
    Regex::new(&format!(r"\b{}", regex::escape(keyword))).unwrap()
}

/// Whole-word match on the state name or its postal code.
fn state_regex(condition: RuleCondition) -> Option<Regex> {
    match condition {
        RuleCondition::Global => None,
        RuleCondition::State { name, abbreviation } => Some(
            Regex::new(&format!(
                r"\b(?:{}|{})\b",
                regex::escape(name),
                regex::escape(abbreviation)
            ))
            .unwrap(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> RuleBook {
        RuleBook::standard()
    }

    fn hard_key(decision: Option<RuleDecision>) -> Option<&'static str> {
        match decision {
            Some(RuleDecision::HardRule { key, .. }) => Some(key),
            _ => None,
        }
    }

    #[test]
    fn mortgage_is_rejected_globally() {
        let decision = book().evaluate("is a mortgage accepted?");
        match decision {
            Some(RuleDecision::HardRule {
                key,
                condition,
                english,
                spanish,
            }) => {
                assert_eq!(key, "mortgage");
                assert_eq!(condition, RuleCondition::Global);
                assert!(english.starts_with("❌ *Elevate:* Mortgage loans are not accepted."));
                assert!(spanish.contains("préstamos hipotecarios"));
            }
            other => panic!("expected hard rule, got {other:?}"),
        }
    }

    #[test]
    fn oportun_in_california_is_rejected() {
        let decision = book().evaluate("can we enroll oportun in california?");
        match decision {
            Some(RuleDecision::HardRule {
                key,
                condition,
                english,
                ..
            }) => {
                assert_eq!(key, "oportun");
                assert_eq!(condition, CALIFORNIA);
                assert!(english.contains("not accepted in California"));
            }
            other => panic!("expected california rule, got {other:?}"),
        }
    }

    #[test]
    fn oportun_state_abbreviation_counts() {
        let decision = book().evaluate("oportun client in ca");
        assert!(matches!(
            decision,
            Some(RuleDecision::HardRule { condition: RuleCondition::State { .. }, .. })
        ));
    }

    #[test]
    fn oportun_elsewhere_is_accepted() {
        // "can" and "cap" contain "ca" but are not the state code.
        let decision = book().evaluate("can oportun be enrolled in texas?");
        match decision {
            Some(RuleDecision::HardRule {
                condition, english, ..
            }) => {
                assert_eq!(condition, RuleCondition::Global);
                assert!(english.starts_with("✅ *Elevate:* Oportun is accepted"));
            }
            other => panic!("expected global oportun rule, got {other:?}"),
        }
    }

    #[test]
    fn regional_finance_is_mixed() {
        let decision = book().evaluate("what about regional finance?");
        match decision {
            Some(RuleDecision::HardRule { english, .. }) => {
                assert!(english.contains("❌ *Elevate:* Regional Finance is not accepted."));
                assert!(english.contains("✅ *Clarity:* Regional Finance is accepted"));
            }
            other => panic!("expected regional finance rule, got {other:?}"),
        }
    }

    #[test]
    fn first_key_in_table_order_wins() {
        // Both "mortgage" and "oportun" appear; mortgage comes first.
        assert_eq!(
            hard_key(book().evaluate("oportun mortgage in california")),
            Some("mortgage")
        );
    }

    #[test]
    fn keyword_needs_word_start() {
        // Deliberately stricter than plain substring containment, under which
        // "first" would hit `irs` and "unsecured loan" would hit `secured loan`.
        assert_eq!(hard_key(book().evaluate("is this the first time?")), None);
        assert_eq!(hard_key(book().evaluate("is an unsecured loan ok?")), None);
        assert_eq!(hard_key(book().evaluate("two secured loans")), Some("secured loan"));
    }

    #[test]
    fn state_patterns_are_compiled_once_per_outcome() {
        let book = book();
        let oportun = book
            .hard_rules
            .iter()
            .find(|compiled| compiled.rule.key == "oportun")
            .unwrap();
        assert_eq!(oportun.states.len(), oportun.rule.outcomes.len());
        assert!(oportun.states.iter().any(Option::is_some));
        assert!(book.hard_rules.iter().all(|c| c.states.len() == c.rule.outcomes.len()));
    }

    #[test]
    fn plural_keywords_still_match() {
        assert_eq!(hard_key(book().evaluate("are judgments allowed")), Some("judgment"));
        assert_eq!(hard_key(book().evaluate("what about aaron's")), Some("aaron"));
    }

    #[test]
    fn snap_tools_hits_hard_rule_before_disqualification() {
        assert_eq!(hard_key(book().evaluate("snap tools balance")), Some("snap tools"));
    }

    #[test]
    fn disqualified_creditor_detected() {
        let decision = book().evaluate("client owes cashnetusa $900");
        assert_eq!(
            decision,
            Some(RuleDecision::Disqualified {
                keyword: "cashnetusa"
            })
        );
    }

    #[test]
    fn disqualified_keyword_with_punctuation() {
        assert_eq!(
            book().evaluate("is wilson b&t ok"),
            Some(RuleDecision::Disqualified {
                keyword: "wilson b&t"
            })
        );
    }

    #[test]
    fn unknown_creditor_falls_through() {
        assert_eq!(book().evaluate("is capital one accepted?"), None);
    }

    #[test]
    fn conditional_rule_without_global_is_skipped() {
        static ONLY_STATE: &[HardRule] = &[
            HardRule {
                key: "acme",
                outcomes: &[RuleOutcome {
                    condition: CALIFORNIA,
                    english: "no in ca",
                    spanish: "no en ca",
                }],
            },
            HardRule {
                key: "acme lending",
                outcomes: &[RuleOutcome {
                    condition: RuleCondition::Global,
                    english: "global",
                    spanish: "global",
                }],
            },
        ];
        static NONE: &[&str] = &[];
        let book = RuleBook::new(ONLY_STATE, NONE);
        assert_eq!(hard_key(book.evaluate("acme lending in texas")), Some("acme lending"));
        assert_eq!(hard_key(book.evaluate("acme lending in california")), Some("acme"));
        assert_eq!(book.evaluate("acme in texas"), None);
    }

    #[test]
    fn table_sizes() {
        let book = book();
        assert_eq!(book.hard_rule_count(), 40);
        assert_eq!(book.disqualified_count(), DISQUALIFIED_CREDITORS.len());
    }

    #[test]
    fn disqualified_message_is_fixed() {
        assert!(DISQUALIFIED_ENGLISH.starts_with("❌ *Elevate:* This creditor is disqualified"));
        assert!(DISQUALIFIED_ENGLISH.ends_with("resolve this debt outside the program.*"));
        assert_eq!(DISQUALIFIED_ENGLISH.lines().count(), 3);
    }
}
