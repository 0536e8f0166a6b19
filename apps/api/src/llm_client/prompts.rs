// Prompt text for portfolio generation.
// The instruction is fixed; only the resume text varies between calls.

/// Instruction appended after the extracted resume text.
pub const PORTFOLIO_INSTRUCTION: &str = "\
Analyze the provided resume and generate a single-file modern portfolio website.

Requirements:

Output only raw HTML, CSS (Tailwind via browser CDN), and JavaScript in one file

Use Tailwind only from
<script src=\"https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4\"></script>

Use Font Awesome CDN for icons

Use Unsplash images only for avatar or hero visuals (no random or broken URLs)

Do not add comments at the start or end of the file

No markdown, no explanations

Design & Structure:

Clean, modern, professional UI

Responsive layout

Working sticky navbar with smooth scrolling

Sections: Hero, About Me, Skills, Projects, Contact Information

Use semantic HTML and clear structure

Resume Intelligence:

Extract name, role, summary, skills, projects, and links from the resume

If a GitHub username is found, try loading avatar from
https://github.com/USERNAME.png

If successful, use it as profile image and link GitHub icon

If not, try LinkedIn profile image

If all fail, use this default image only:
https://images.unsplash.com/illustrations/a-drawing-of-a-man-wearing-a-tie-7EbR-jFH7cI

Do not guess usernames or create fake links

Output:

Return only the complete HTML code

Ready to open directly in a browser";

/// Builds the full generation prompt: resume text first, then the fixed instruction.
pub fn build_portfolio_prompt(resume_text: &str) -> String {
    format!("{} {}", resume_text.trim(), PORTFOLIO_INSTRUCTION)
}
