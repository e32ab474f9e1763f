// =====================================================================================
// File: service-voice/src/twiml.rs
// Description: Call-flow XML generation for the telephony provider
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

/// Builder for the provider's call-flow XML.
///
/// Three verb shapes cover the whole surface: speak a line, gather speech
/// with an action URL and timeout, and hang up. All text is escaped.
#[derive(Debug, Default)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

#[derive(Debug)]
enum Verb {
    Say(String),
    Pause(u32),
    Gather {
        action: String,
        timeout: u32,
        prompt: String,
    },
    Hangup,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    pub fn pause(mut self, seconds: u32) -> Self {
        self.verbs.push(Verb::Pause(seconds));
        self
    }

    pub fn gather(mut self, action: impl Into<String>, timeout: u32, prompt: impl Into<String>) -> Self {
        self.verbs.push(Verb::Gather {
            action: action.into(),
            timeout,
            prompt: prompt.into(),
        });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn build(self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");
        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    xml.push_str(&format!(
                        "    <Say voice=\"alice\" language=\"en-US\">{}</Say>\n",
                        escape(text)
                    ));
                }
                Verb::Pause(seconds) => {
                    xml.push_str(&format!("    <Pause length=\"{}\"/>\n", seconds));
                }
                Verb::Gather {
                    action,
                    timeout,
                    prompt,
                } => {
                    xml.push_str(&format!(
                        "    <Gather input=\"speech\" timeout=\"{}\" action=\"{}\" method=\"POST\">\n",
                        timeout,
                        escape(action)
                    ));
                    xml.push_str(&format!(
                        "        <Say voice=\"alice\" language=\"en-US\">{}</Say>\n",
                        escape(prompt)
                    ));
                    xml.push_str("    </Gather>\n");
                }
                Verb::Hangup => xml.push_str("    <Hangup/>\n"),
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Greeting for a fresh call: prompt for speech and route to first-turn
/// processing, with a retry line if the gather times out.
pub fn greeting(speech_timeout: u32) -> String {
    VoiceResponse::new()
        .gather(
            "/voice/process",
            speech_timeout,
            "Emergency services. Please describe your emergency clearly.",
        )
        .say("I didn't catch that. Please state your emergency now.")
        .gather("/voice/process", speech_timeout, "Go ahead, I am listening.")
        .say("If you need immediate assistance, please call back. Goodbye.")
        .hangup()
        .build()
}

/// Generic spoken apology used for malformed webhooks and internal faults.
/// Callers always hear an apology and a hangup, never a silent drop.
pub fn error_response() -> String {
    VoiceResponse::new()
        .say("I'm sorry, I'm experiencing technical difficulties.")
        .say("Please try again later. Goodbye.")
        .hangup()
        .build()
}

/// Safe response when processing misses its own deadline
pub fn degraded_response() -> String {
    VoiceResponse::new()
        .say("Help is being arranged for you right now.")
        .pause(1)
        .say("Stay on the line if you can, and stay safe. Responders have been notified.")
        .hangup()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_say_gather_hangup_shapes() {
        let xml = VoiceResponse::new()
            .say("Help is coming!")
            .pause(1)
            .gather("/voice/followup", 5, "Is it spreading?")
            .hangup()
            .build();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<Say voice=\"alice\" language=\"en-US\">Help is coming!</Say>"));
        assert!(xml.contains("<Pause length=\"1\"/>"));
        assert!(xml.contains(
            "<Gather input=\"speech\" timeout=\"5\" action=\"/voice/followup\" method=\"POST\">"
        ));
        assert!(xml.contains("<Hangup/>"));
        assert!(xml.ends_with("</Response>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = VoiceResponse::new().say("Fire & smoke <upstairs>").build();
        assert!(xml.contains("Fire &amp; smoke &lt;upstairs&gt;"));
        assert!(!xml.contains("<upstairs>"));
    }

    #[test]
    fn test_greeting_routes_to_first_turn() {
        let xml = greeting(5);
        assert!(xml.contains("action=\"/voice/process\""));
        assert!(xml.contains("describe your emergency"));
    }

    #[test]
    fn test_error_response_apologizes_and_hangs_up() {
        let xml = error_response();
        assert!(xml.contains("technical difficulties"));
        assert!(xml.contains("<Hangup/>"));
    }
}
