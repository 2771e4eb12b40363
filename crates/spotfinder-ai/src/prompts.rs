//! Prompt text for every generative call.

use spotfinder_weather::CurrentWeather;

pub const SPOT_SYSTEM: &str =
    "You are a fishing expert. Only respond with valid JSON arrays containing fish species.";

pub fn spot_analysis(location: &str) -> String {
    format!(
        "Based on this fishing location's name and geographical position ({location}), \
         list exactly 3 types of fish that anglers are most likely to catch here. \
         Return ONLY a JSON array with each fish having a name and brief description. \
         Keep descriptions under 100 characters. \
         Example: [{{\"name\": \"Bass\", \"description\": \"Common in lakes\"}}]"
    )
}

pub const WEATHER_SYSTEM: &str =
    "You are a fishing expert. Be concise and specific about fishing conditions.";

pub fn weather_conditions(weather: &CurrentWeather) -> String {
    format!(
        "Given the following weather conditions:\n\
         - Temperature: {}°C\n\
         - Weather: {}\n\
         - Wind Speed: {} m/s\n\
         - Humidity: {}%\n\n\
         Provide a brief 2-sentence analysis of the fishing conditions and the likelihood of catching fish.",
        weather.temp_celsius, weather.condition_label, weather.wind_speed, weather.humidity
    )
}

pub const REGULATIONS_SYSTEM: &str = r#"You are a fishing regulations expert. For every request, you MUST return a valid JSON object in this exact format:
{
  "catchLimits": ["limit 1", "limit 2", ...],
  "seasonDates": ["season 1", "season 2", ...],
  "region": "location name"
}"#;

pub const REGULATIONS_TEMPERATURE: f32 = 0.7;

pub fn regulations(region: &str) -> String {
    format!("What are the current fishing regulations for {region}?")
}

pub const CHAT_TEMPERATURE: f32 = 0.7;

pub fn expert_chat_system(region: &str) -> String {
    format!(
        "You are a helpful and knowledgeable fishing regulations expert. You have extensive \
         knowledge about fishing laws, regulations, and best practices. Provide concise, direct \
         answers using plain text only (no markdown, no formatting, no bullet points). Keep \
         responses brief and to the point, typically 2-3 short sentences. Focus on:\n\
         - Quick facts about fishing regulations\n\
         - Simple explanations of limits and seasons\n\
         - Clear yes/no answers when possible\n\
         - Direct advice on compliance\n\n\
         The user is asking about fishing in: {region}"
    )
}

pub const FISH_ID_SYSTEM: &str = "You are a marine biology and conservation expert. \
     Provide accurate species identification and conservation information in JSON format.";

pub fn fish_identification(object_name: &str, labels: &str) -> String {
    format!(
        "Based on the detected fish ({object_name}) and these visual labels: {labels}, please:\n\
         1. Identify the most likely species of fish\n\
         2. Provide a brief description of this species (2-3 sentences about habitat and behavior)\n\
         3. Assess its conservation status (e.g., Least Concern, Near Threatened, Vulnerable, Endangered, etc.)\n\
         Return the response as a JSON object with fields: species, description, conservationStatus"
    )
}

pub const DESCRIPTION_SYSTEM: &str =
    "You are a fishing guide writing short spot descriptions for anglers.";

pub fn spot_description(fish_analysis: &str) -> String {
    format!(
        "Based on this fish analysis data: \"{fish_analysis}\", generate a concise and \
         informative description of this fishing spot. The description should be about 2-3 \
         sentences long and focus on the key aspects that would interest anglers."
    )
}
