//! Room types recognised by the analysis and comment endpoints.

use serde::{Deserialize, Serialize};

use crate::models::CommentContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Kitchen,
    #[default]
    LivingRoom,
    Bedroom,
    Bathroom,
    Office,
    EmptyRoom,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Kitchen => "kitchen",
            RoomType::LivingRoom => "living_room",
            RoomType::Bedroom => "bedroom",
            RoomType::Bathroom => "bathroom",
            RoomType::Office => "office",
            RoomType::EmptyRoom => "empty_room",
        }
    }

    /// Parses the label a model writes after `TYP:`. Polish names are what
    /// the prompt asks for; English identifiers are accepted as well.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label
            .trim()
            .trim_matches(|c: char| c == '[' || c == ']' || c == '.' || c == '"')
            .trim()
            .to_lowercase();
        let room = match label.as_str() {
            "kuchnia" | "kitchen" => RoomType::Kitchen,
            "pokój dzienny" | "salon" | "living_room" | "living room" => RoomType::LivingRoom,
            "sypialnia" | "bedroom" => RoomType::Bedroom,
            "łazienka" | "bathroom" => RoomType::Bathroom,
            "biuro" | "office" => RoomType::Office,
            "puste pomieszczenie" | "empty_room" | "empty room" => RoomType::EmptyRoom,
            _ => return None,
        };
        Some(room)
    }

    // instrumental case, as used in "zdjęcie {name}"
    pub fn polish_instrumental(&self) -> &'static str {
        match self {
            RoomType::Kitchen => "kuchnią",
            RoomType::LivingRoom => "pokojem dziennym",
            RoomType::Bedroom => "sypialnią",
            RoomType::Bathroom => "łazienką",
            RoomType::Office => "biurem",
            RoomType::EmptyRoom => "pustym pomieszczeniem",
        }
    }
}

pub const DEFAULT_ANALYSIS_COMMENT: &str = "Ooo, jakie piękne pomieszczenie! Widzę tutaj naprawdę duży potencjał na stworzenie wspaniałej przestrzeni.";
const DEFAULT_GENERATED_COMMENT: &str = "Wow, to wygenerowane wnętrze wygląda naprawdę fantastycznie!";

pub fn fallback_comment(room: Option<RoomType>, context: CommentContext) -> &'static str {
    let Some(room) = room else {
        return match context {
            CommentContext::RoomAnalysis => DEFAULT_ANALYSIS_COMMENT,
            CommentContext::GeneratedImage => DEFAULT_GENERATED_COMMENT,
        };
    };

    match context {
        CommentContext::RoomAnalysis => match room {
            RoomType::Kitchen => "Ooo, widzę piękną kuchnię! To pomieszczenie ma naprawdę dużo potencjału na stworzenie wspaniałej przestrzeni do gotowania i spotkań z rodziną.",
            RoomType::LivingRoom => "Wow, jaki przytulny pokój dzienny! Widzę tutaj doskonałe miejsce do relaksu i spędzania czasu z bliskimi.",
            RoomType::Bedroom => "Świetnie! Ta sypialnia wygląda bardzo obiecująco. To będzie idealne miejsce do odpoczynku i regeneracji sił.",
            RoomType::Bathroom => "Uwielbiam ten styl łazienki! Widzę tutaj piękną przestrzeń, która może stać się prawdziwą oazą spokoju.",
            RoomType::Office => "Wow, to biuro ma naprawdę dobry potencjał! Widzę doskonałe miejsce do pracy i kreatywności.",
            RoomType::EmptyRoom => "Świetnie! Puste pomieszczenie to jak czysta karta - możemy stworzyć tutaj coś naprawdę wyjątkowego!",
        },
        CommentContext::GeneratedImage => match room {
            RoomType::Kitchen => "Wow, ta wygenerowana kuchnia wygląda naprawdę fantastycznie! Widzę tutaj doskonałą przestrzeń do gotowania i spotkań z rodziną.",
            RoomType::LivingRoom => "Świetnie! Ten pokój dzienny ma naprawdę przytulny klimat. Idealne miejsce do relaksu i spędzania czasu z bliskimi.",
            RoomType::Bedroom => "Uwielbiam tę sypialnię! Wygląda na bardzo komfortową i spokojną przestrzeń do odpoczynku.",
            RoomType::Bathroom => "Ta łazienka ma naprawdę elegancki styl! Doskonałe miejsce do relaksu i regeneracji.",
            RoomType::Office => "Fantastyczne biuro! Widzę tutaj idealne warunki do pracy i kreatywności.",
            RoomType::EmptyRoom => "Świetnie! To puste pomieszczenie ma naprawdę duży potencjał - możemy stworzyć tutaj coś wyjątkowego!",
        },
    }
}
