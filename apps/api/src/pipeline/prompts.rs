// All LLM prompt constants for the scoring stage.

/// System prompt for job-fit scoring — enforces JSON-only output.
pub const SCORING_SYSTEM: &str =
    "You are an expert resume-to-job matching analyst. \
    Score how well a candidate matches a job posting. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Scoring prompt template. Replace `{resume}` and `{job_summary}` before sending.
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Score how well this candidate matches the job posting.

CANDIDATE'S RESUME:
{resume}

JOB POSTING:
{job_summary}

Analyze the match by:
1. Extracting skills from the resume
2. Identifying required skills in the job description
3. Comparing experience level and responsibilities
4. Evaluating education fit
5. Considering location/remote preferences

Return a JSON object with this EXACT schema (no extra fields):
{
  "score": 72,
  "reasoning": "Concise 1-2 sentence explanation",
  "matched_skills": ["skill that matches", "another matching skill"]
}

`score` is an integer from 0 to 100:
- 90-100: Perfect match (all requirements + ideal candidate)
- 75-89: Strong match (meets most requirements well)
- 60-74: Good match (meets key requirements)
- 40-59: Moderate match (some relevant experience)
- 0-39: Weak match (few relevant qualifications)"#;
