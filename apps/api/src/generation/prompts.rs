// Instruction templates for the two tailoring modes.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Job-description mode. Replace: {job_description}, {resume}, {preservation_rules},
/// {output_rules}
pub const JOB_DESCRIPTION_TEMPLATE: &str = r#"You are an expert resume tailor and LaTeX specialist. Your task is to modify the provided LaTeX resume to better match the job description while maintaining perfect LaTeX formatting.

JOB DESCRIPTION:
{job_description}

ORIGINAL LATEX RESUME:
{resume}

INSTRUCTIONS:
1. EXTRACT KEYWORDS: identify both technical and non-technical elements of the job description:
   - Hard skills: languages, frameworks, tools, platforms
   - Soft skills: leadership, communication, problem-solving, strategic thinking
   - Domain knowledge and methodologies
2. STRATEGIC PLACEMENT: integrate these keywords naturally into the Summary, Experience, Projects and Technical Skills sections.
3. CONTENT GUIDELINES:
   - Make changes feel natural and authentic; do not keyword-stuff
   - Keep the same professional tone and style
   - Maintain factual consistency: never change dates, company names or titles
   - NEVER invent years of experience or skills the candidate does not have

{preservation_rules}

{output_rules}"#;

/// Keyword mode. Replace: {keywords}, {resume}, {preservation_rules}, {output_rules}
pub const KEYWORDS_TEMPLATE: &str = r#"You are an expert LaTeX resume editor. Insert the EXACT provided keywords into the resume, focusing on the Summary and Skills Summary sections.

KEYWORDS (exact terms to include):
{keywords}

ORIGINAL LATEX RESUME:
{resume}

STRICT RULES:
- Do NOT invent new keywords beyond the provided list.
- If a keyword (or a close variation) already exists, REPLACE it with the EXACT provided term.
- Prioritize adding into:
  1) Summary (as natural phrases)
  2) Skills Summary (under appropriate bullet points)
- Keep additions concise and natural; avoid repetition.

{preservation_rules}

{output_rules}"#;
