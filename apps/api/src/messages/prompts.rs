// All LLM prompt constants for outreach messages.

/// System prompt for message generation.
pub const MESSAGE_SYSTEM: &str =
    "You are a professional business development expert who writes highly personalized \
    and effective LinkedIn outreach messages. Your messages are concise, genuine, and focus \
    on providing value to the recipient.";

/// Message prompt template. Replace `{name}`, `{job_title}`, `{company}` and the two
/// optional line slots `{location_line}` / `{summary_line}` before sending.
pub const MESSAGE_PROMPT_TEMPLATE: &str = r#"Generate a professional, personalized LinkedIn outreach message for the following person:

Name: {name}
Job Title: {job_title}
Company: {company}
{location_line}
{summary_line}

Requirements:
- Keep it professional and friendly
- Mention their role and company specifically
- Reference how OutFlo can help with lead generation and outreach automation
- Keep it under 200 words
- Make it sound genuine and personalized
- Include a clear call-to-action to connect
- Avoid being too salesy or generic

The message should be for OutFlo, a company that helps businesses automate their outreach to increase meetings and sales."#;

/// Fallback templates used when the LLM is unavailable. Same placeholders as above.
pub const FALLBACK_TEMPLATES: [&str; 3] = [
    "Hi {name},

I noticed you're working as a {job_title} at {company}. I'm reaching out because OutFlo helps companies like {company} automate their outreach processes to significantly increase meetings and sales.

Given your role in {job_title}, I thought you might be interested in learning how we've helped similar professionals streamline their lead generation efforts.

Would you be open to a brief conversation about how OutFlo could benefit {company}?

Best regards!",
    "Hello {name},

I came across your profile and was impressed by your work as {job_title} at {company}.

OutFlo specializes in helping businesses automate their outreach to boost meetings and sales. I believe there could be some great opportunities for {company} to leverage our platform.

Would you be interested in connecting to discuss how OutFlo can help streamline your lead generation process?

Looking forward to connecting!",
    "Hi {name},

Hope you're doing well! I see you're a {job_title} at {company}, and I wanted to reach out because OutFlo has been helping companies in your space automate their outreach and increase their sales meetings.

I'd love to share how we've helped similar professionals at companies like {company} improve their lead generation results.

Would you be open to a quick chat about this?

Best!",
];
