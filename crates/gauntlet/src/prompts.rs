//! System prompt constants and prompt builders for the generation calls.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble content
//! changes, so a logged response can be traced to the prompt that produced
//! it.

/// Prompt version. Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Query generation for complaint mining.
pub const PAIN_QUERY_PREAMBLE: &str = "\
You are a market research assistant mining the public web for complaints. \
Given a problem description and a target audience, produce search queries \
that surface real people complaining about the problem: forum threads, \
reviews, social posts. Mix phrasings — frustration language, 'alternatives' \
searches, 'why is X so hard' forms.

Return ONLY a JSON array of query strings, no commentary.";

/// Complaint classification and pain scoring.
pub const PAIN_ANALYSIS_PREAMBLE: &str = "\
You are an analyst classifying complaint evidence about a problem. \
Tier the complaints: tier_3 = explicit willingness to pay or active search \
for a paid solution; tier_2 = strong recurring frustration; tier_1 = mild \
or one-off annoyance; tier_0 = off-topic. Then score overall pain 1-10 and \
rate evidence quality (low / medium / high).

Return ONLY a JSON object:
{
  \"pain_score\": <1-10>,
  \"complaint_breakdown\": {\"tier_3\": n, \"tier_2\": n, \"tier_1\": n, \"tier_0\": n},
  \"quality_rating\": \"low|medium|high\",
  \"high_impact_ratio\": <0-1>,
  \"quality_score\": <0-1>,
  \"urgency_percentage\": <0-100>,
  \"emotional_intensity_percentage\": <0-100>,
  \"key_themes\": [\"...\"]
}";

/// Query generation for competitor discovery.
pub const MARKET_QUERY_PREAMBLE: &str = "\
You are a market research assistant mapping the competitive landscape for a \
product idea. Produce search queries that surface competing products and \
their pricing pages: comparison posts, 'best X software' lists, 'X pricing' \
searches, alternative roundups.

Return ONLY a JSON array of query strings, no commentary.";

/// Market opportunity scoring.
pub const MARKET_ASSESSMENT_PREAMBLE: &str = "\
You are a market analyst. Given a problem and a list of competitors with \
whatever pricing was found, score the market opportunity 1-10: a crowded \
market of well-priced incumbents with no gaps scores low; paying customers \
plus an underserved segment scores high. Name the gaps you see.

Return ONLY a JSON object:
{\"opportunity_score\": <1-10>, \"market_gaps\": [\"...\"], \"reasoning\": \"...\"}";

/// Landing page copy generation.
pub const LANDING_PAGE_PREAMBLE: &str = "\
You are a conversion copywriter. Write landing page copy for a product that \
solves the given problem for the given audience. Plain confident language, \
no buzzwords.

Return ONLY a JSON object:
{
  \"headline\": \"...\",
  \"subheadline\": \"...\",
  \"benefits\": [\"...\", \"...\", \"...\"],
  \"call_to_action\": \"...\",
  \"faq\": [{\"question\": \"...\", \"answer\": \"...\"}]
}";

/// Landing page scoring.
pub const CONTENT_EVAL_PREAMBLE: &str = "\
You are a conversion rate expert reviewing landing page copy. Predict the \
visitor-to-signup conversion rate as a fraction (0.02 = 2%) and score the \
messaging effectiveness 1-10. List what works and what doesn't.

Return ONLY a JSON object:
{\"predicted_conversion_rate\": <0-1>, \"messaging_score\": <1-10>, \
\"strengths\": [\"...\"], \"weaknesses\": [\"...\"]}";

/// Survey question generation.
pub const SURVEY_QUESTIONS_PREAMBLE: &str = "\
You are a customer researcher. Write short survey questions that test \
willingness to pay for a solution to the given problem. Always include a \
direct monthly-price question and a current-solution question.

Return ONLY a JSON array of question strings.";

/// Simulated survey respondents.
pub const SURVEY_SIMULATION_PREAMBLE: &str = "\
You simulate survey panels. Given a problem, an audience, a landing page \
headline, and survey questions, produce realistic respondent answers. \
Respondents vary: some would not pay at all (willingness_to_pay 0), some \
are enthusiastic. Ground willingness_to_pay in what the audience actually \
spends on tools.

Return ONLY a JSON array of objects:
[{\"persona\": \"...\", \"willingness_to_pay\": <dollars/month>, \
\"current_solution\": \"...\", \"must_have_feature\": \"...\"}]";

pub fn pain_query_prompt(problem: &str, audience: &str, count: usize) -> String {
    format!(
        "Problem: {problem}\nTarget audience: {audience}\n\nGenerate {count} search queries."
    )
}

pub fn pain_analysis_prompt(problem: &str, complaints: &[String]) -> String {
    format!(
        "Problem: {problem}\n\nComplaint snippets ({count}):\n{snippets}",
        count = complaints.len(),
        snippets = complaints.join("\n---\n")
    )
}

pub fn market_query_prompt(problem: &str, audience: &str, count: usize) -> String {
    format!(
        "Product idea: solve \"{problem}\" for {audience}.\n\nGenerate {count} search queries."
    )
}

pub fn market_assessment_prompt(problem: &str, competitor_lines: &[String]) -> String {
    format!(
        "Problem: {problem}\n\nCompetitors found ({count}):\n{lines}",
        count = competitor_lines.len(),
        lines = competitor_lines.join("\n")
    )
}

pub fn landing_page_prompt(
    problem: &str,
    audience: &str,
    themes: &[String],
    gaps: &[String],
) -> String {
    let theme_block = if themes.is_empty() {
        String::new()
    } else {
        format!("\nComplaint themes to speak to: {}", themes.join(", "))
    };
    let gap_block = if gaps.is_empty() {
        String::new()
    } else {
        format!("\nMarket gaps to position against: {}", gaps.join(", "))
    };
    format!("Problem: {problem}\nAudience: {audience}{theme_block}{gap_block}")
}

pub fn content_eval_prompt(page_text: &str) -> String {
    format!("Landing page copy:\n{page_text}")
}

pub fn survey_questions_prompt(problem: &str, audience: &str) -> String {
    format!("Problem: {problem}\nAudience: {audience}\n\nGenerate 5-8 questions.")
}

pub fn survey_simulation_prompt(
    problem: &str,
    audience: &str,
    headline: &str,
    questions: &[String],
    count: usize,
) -> String {
    format!(
        "Problem: {problem}\nAudience: {audience}\nLanding page headline: {headline}\n\n\
         Questions:\n{questions}\n\nSimulate {count} respondents.",
        questions = questions.join("\n")
    )
}

/// Deterministic complaint-mining queries, used when query generation fails.
pub fn fallback_pain_queries(problem: &str, audience: &str, count: usize) -> Vec<String> {
    let templates = [
        format!("{problem} problems reddit"),
        format!("{problem} frustrating"),
        format!("{problem} complaints"),
        format!("why is {problem} so hard"),
        format!("{problem} waste of time"),
        format!("how to deal with {problem}"),
        format!("{problem} alternatives"),
        format!("{problem} workaround"),
        format!("{audience} {problem} help"),
        format!("{audience} struggling with {problem}"),
        format!("{problem} rant"),
        format!("{problem} manual process"),
    ];
    templates.into_iter().cycle().take(count).collect()
}

/// Deterministic competitor-discovery queries.
pub fn fallback_market_queries(problem: &str, audience: &str, count: usize) -> Vec<String> {
    let templates = [
        format!("{problem} software pricing"),
        format!("best {problem} software"),
        format!("{problem} tool comparison"),
        format!("{problem} saas alternatives"),
        format!("{problem} app per month"),
        format!("{problem} software for {audience}"),
        format!("{problem} pricing plans"),
        format!("top {problem} tools 2024"),
    ];
    templates.into_iter().cycle().take(count).collect()
}
