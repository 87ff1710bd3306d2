// Prompt constants for the gap analyzer. The analyzer module is the only
// caller of the Anthropic API in this service.

/// System prompt — enforces JSON-only output.
pub const GAP_ANALYSIS_SYSTEM: &str =
    "You are an expert career coach and technical interviewer. \
    Compare a candidate resume against a target job description and identify skill gaps. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Gap analysis prompt template. Replace `{resume_text}` and `{jd_text}`
/// before sending.
pub const GAP_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Compare the following resume against the job description and identify the candidate's skill gaps.

Return a JSON object with this EXACT schema (no extra fields):
{
  "missing_skills": ["Kubernetes", "Terraform"],
  "learning_steps": [
    {"title": "Step title", "description": "What to do and why"}
  ],
  "interview_questions": ["A question the candidate should prepare for"]
}

Rules:
- missing_skills: between 1 and 10 skills the job requires that the resume does not evidence. Most important first.
- learning_steps: EXACTLY 3 steps, ordered as a roadmap from first to last. Each step must be concrete and actionable.
- interview_questions: EXACTLY 3 questions targeting the identified gaps.
- Base everything on the provided texts only. Do not invent requirements the job description does not state.

RESUME:
{resume_text}

JOB DESCRIPTION:
{jd_text}
"#;

/// Builds the final prompt from the two input texts.
pub fn build_gap_analysis_prompt(resume_text: &str, jd_text: &str) -> String {
    GAP_ANALYSIS_PROMPT_TEMPLATE
        .replace("{resume_text}", resume_text)
        .replace("{jd_text}", jd_text)
}
