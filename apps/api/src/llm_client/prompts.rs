// Shared prompt fragments used by every instruction sent to the provider.
// Each mode defines its own template in generation::prompts.

/// Formatting constraints appended to every tailoring instruction.
pub const LATEX_OUTPUT_RULES: &str = "\
CRITICAL OUTPUT REQUIREMENTS:
- Return ONLY the complete modified LaTeX code
- Do NOT wrap the code in markdown code blocks
- Do NOT include any explanations, comments, or additional text before or after the LaTeX code
- The response must start directly with \\documentclass and end with \\end{document}
- The output must be pure LaTeX that compiles without any modifications";

/// Structural rules that keep the template's macros intact.
pub const LATEX_PRESERVATION_RULES: &str = "\
LATEX FORMATTING RULES:
- NEVER break LaTeX syntax or commands
- Keep the document class, packages and formatting commands unchanged
- Only modify the CONTENT within LaTeX commands, not the commands themselves
- Ensure every opening brace { has a matching closing brace }
- Never add empty braces {} after LaTeX commands
- \\resumeProjectHeading always takes exactly TWO arguments written as {content}{}";
