use chrono::{Datelike, Local};
use std::fmt;

use crate::context::FieldContext;

/// Text of a quick question, fixed or built from the current field context
#[derive(Clone, Copy)]
pub enum QuestionPrompt {
    Static(&'static str),
    Dynamic(fn(&FieldContext) -> String),
}

impl fmt::Debug for QuestionPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionPrompt::Static(text) => f.debug_tuple("Static").field(text).finish(),
            QuestionPrompt::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A canned question reachable from the menu or a hardware button
#[derive(Debug, Clone, Copy)]
pub struct QuickQuestion {
    /// Also the hardware button name
    pub id: &'static str,
    pub label: &'static str,
    pub prompt: QuestionPrompt,
}

impl QuickQuestion {
    pub fn text(&self, context: &FieldContext) -> String {
        match self.prompt {
            QuestionPrompt::Static(text) => text.to_string(),
            QuestionPrompt::Dynamic(generate) => generate(context),
        }
    }
}

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

fn seasonal_crops(context: &FieldContext) -> String {
    let month = MONTHS[Local::now().month0() as usize];
    let mut question = format!("What crops should I plant in {}", month);
    if let Some(loc) = &context.location {
        question.push_str(&format!(" in {}, {}", loc.city, loc.country));
    }
    match &context.weather {
        Some(weather) => question.push_str(&format!(
            " with the current weather at {:.0}°C and {:.0}% humidity?",
            weather.temperature_c, weather.humidity_percent
        )),
        None => question.push_str(" based on current weather?"),
    }
    question
}

fn weather_planning(context: &FieldContext) -> String {
    match &context.weather {
        Some(weather) => {
            let rain: f64 = weather.forecast.precipitation_mm.iter().sum();
            format!(
                "It is {:.0}°C with {:.0}% humidity and {:.1} mm of rain forecast over the next days. \
How should these conditions affect my farming decisions?",
                weather.temperature_c, weather.humidity_percent, rain
            )
        }
        None => "How should weather conditions affect my farming decisions?".to_string(),
    }
}

pub const QUICK_QUESTIONS: [QuickQuestion; 8] = [
    QuickQuestion {
        id: "crops",
        label: "🌱 Seasonal Crops",
        prompt: QuestionPrompt::Dynamic(seasonal_crops),
    },
    QuickQuestion {
        id: "pests",
        label: "🐛 Pest Control",
        prompt: QuestionPrompt::Static("How do I identify and control pests organically?"),
    },
    QuickQuestion {
        id: "irrigation",
        label: "💧 Irrigation Tips",
        prompt: QuestionPrompt::Static("What's the best irrigation schedule for my crops?"),
    },
    QuickQuestion {
        id: "weather",
        label: "🌡️ Weather Planning",
        prompt: QuestionPrompt::Dynamic(weather_planning),
    },
    QuickQuestion {
        id: "harvest",
        label: "🌾 Harvest Time",
        prompt: QuestionPrompt::Static("When is the optimal time to harvest my crops?"),
    },
    QuickQuestion {
        id: "equipment",
        label: "🔧 Equipment Care",
        prompt: QuestionPrompt::Static("Robot and equipment maintenance tips for farming?"),
    },
    QuickQuestion {
        id: "fertilizers",
        label: "🌿 Natural Fertilizers",
        prompt: QuestionPrompt::Static("What are the best organic fertilizer recommendations?"),
    },
    QuickQuestion {
        id: "monitoring",
        label: "📊 Crop Monitoring",
        prompt: QuestionPrompt::Static("How do I monitor and assess crop health effectively?"),
    },
];

/// Find a quick question by id (case-insensitive) or 1-based index
pub fn find_quick_question(selector: &str) -> Option<&'static QuickQuestion> {
    let selector = selector.trim();
    if let Ok(index) = selector.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| QUICK_QUESTIONS.get(i));
    }
    QUICK_QUESTIONS
        .iter()
        .find(|q| q.id.eq_ignore_ascii_case(selector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DailyForecast, LocationContext, WeatherContext};

    #[test]
    fn test_find_by_id_and_index() {
        assert_eq!(find_quick_question("PESTS").unwrap().id, "pests");
        assert_eq!(find_quick_question(" 1 ").unwrap().id, "crops");
        assert_eq!(find_quick_question("8").unwrap().id, "monitoring");
        assert!(find_quick_question("0").is_none());
        assert!(find_quick_question("9").is_none());
        assert_eq!(find_quick_question("Harvest").unwrap().id, "harvest");
        assert_eq!(find_quick_question("5").unwrap().label, "🌾 Harvest Time");
        assert!(find_quick_question("soil").is_none());
    }

    #[test]
    fn test_static_prompt_ignores_context() {
        let q = find_quick_question("irrigation").unwrap();
        assert_eq!(
            q.text(&FieldContext::default()),
            "What's the best irrigation schedule for my crops?"
        );
    }

    #[test]
    fn test_dynamic_prompt_uses_context() {
        let ctx = FieldContext {
            location: Some(LocationContext {
                city: "Fresno".to_string(),
                country: "United States".to_string(),
                latitude: 36.7,
                longitude: -119.8,
            }),
            weather: Some(WeatherContext {
                temperature_c: 31.0,
                humidity_percent: 20.0,
                forecast: DailyForecast {
                    precipitation_mm: vec![0.5, 1.0],
                    ..Default::default()
                },
            }),
        };

        let crops = find_quick_question("crops").unwrap().text(&ctx);
        assert!(crops.contains("Fresno, United States"));
        assert!(crops.contains("31°C"));

        let weather = find_quick_question("weather").unwrap().text(&ctx);
        assert!(weather.contains("1.5 mm"));
    }

    #[test]
    fn test_dynamic_prompt_without_context() {
        let crops = find_quick_question("crops")
            .unwrap()
            .text(&FieldContext::default());
        assert!(crops.ends_with("based on current weather?"));
    }
}
