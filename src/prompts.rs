//! Built-in prompts for before/after transitions.

use vidstage_jobs::ProviderKind;

/// Prompt sent with a side-by-side composite reference image.
pub const COMPOSITE_PROMPT: &str = "\
The reference image is a control diagram showing two states of one scene.
The LEFT panel, labelled BEFORE, is the starting state.
The RIGHT panel, labelled AFTER, is the final state.

Open on a single full-frame shot that matches the BEFORE state exactly.
End on a single full-frame shot that matches the AFTER state exactly.
Transition continuously and in one direction from BEFORE to AFTER.

Keep the subject, framing, lighting and camera position fixed.
Only the differences between the two states may change over time.
Do not add or remove objects, and do not reframe.

Never show a split screen, the side-by-side layout, labels, frames or text.
Do not blend or average the two panels, and never swap their order.";

/// Prompt used when the provider receives separate first and last frames.
pub const FIRST_LAST_PROMPT: &str = "\
A cinematic transition from the first frame to the last frame. \
Keep lighting, framing and camera position consistent throughout, \
and change only what differs between the two frames.";

/// Prompt for image models that receive both states as separate images.
pub const IMAGE_PROMPT: &str = "\
The first image shows a scene before a change and the second image shows the same scene after it. \
Render one photorealistic image of the scene in its after state, \
keeping the framing, lighting and camera position of the first image.";

/// Default prompt for the way `provider` receives the two states.
pub fn default_prompt(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::OpenAi => COMPOSITE_PROMPT,
        ProviderKind::Veo => FIRST_LAST_PROMPT,
        ProviderKind::Gemini => IMAGE_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_per_provider() {
        assert!(default_prompt(ProviderKind::OpenAi).contains("LEFT panel"));
        assert!(default_prompt(ProviderKind::Veo).contains("first frame"));
        assert!(default_prompt(ProviderKind::Gemini).contains("second image"));
    }
}
