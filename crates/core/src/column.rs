use crate::content::ContentShape;
use crate::error::CoreError;

/// Every field of a country document the admin panel knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Name,
    Region,
    Flag,
    Banner,
    Pdf,
    EmergencyContacts,
    Committees,
    Information,
    Transport,
    Cities,
    SummerReception,
    Cuisine,
    OtherInformation,
    FunFacts,
    Gallery,
    SocialLinks,
}

const TRANSPORT_GROUPS: &[&str] = &["public_transport", "taxis", "car_rental", "intercity"];
const CUISINE_GROUPS: &[&str] = &["food", "drinks"];

impl Column {
    pub const ALL: [Column; 16] = [
        Column::Name,
        Column::Region,
        Column::Flag,
        Column::Banner,
        Column::Pdf,
        Column::EmergencyContacts,
        Column::Committees,
        Column::Information,
        Column::Transport,
        Column::Cities,
        Column::SummerReception,
        Column::Cuisine,
        Column::OtherInformation,
        Column::FunFacts,
        Column::Gallery,
        Column::SocialLinks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Region => "region",
            Self::Flag => "flag",
            Self::Banner => "banner",
            Self::Pdf => "pdf",
            Self::EmergencyContacts => "emergencyContacts",
            Self::Committees => "committees",
            Self::Information => "information",
            Self::Transport => "transport",
            Self::Cities => "cities",
            Self::SummerReception => "summerReception",
            Self::Cuisine => "cuisine",
            Self::OtherInformation => "otherInformation",
            Self::FunFacts => "funFacts",
            Self::Gallery => "gallery",
            Self::SocialLinks => "socialLinks",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::InvalidData(format!("unknown column: {s}")))
    }

    /// Human label used in notifications.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Region => "Region",
            Self::Flag => "Flag",
            Self::Banner => "Banner",
            Self::Pdf => "PDF",
            Self::EmergencyContacts => "Emergency contacts",
            Self::Committees => "Committees",
            Self::Information => "General information",
            Self::Transport => "Transport",
            Self::Cities => "Cities",
            Self::SummerReception => "Summer reception",
            Self::Cuisine => "Cuisine",
            Self::OtherInformation => "Other information",
            Self::FunFacts => "Fun facts",
            Self::Gallery => "Gallery",
            Self::SocialLinks => "Social links",
        }
    }

    pub fn shape(&self) -> ContentShape {
        match self {
            Self::Name | Self::Region | Self::Cities | Self::FunFacts => ContentShape::Scalar,
            Self::EmergencyContacts | Self::Information | Self::SocialLinks => {
                ContentShape::KeyedField
            }
            Self::Committees
            | Self::Transport
            | Self::SummerReception
            | Self::Cuisine
            | Self::OtherInformation => ContentShape::Record,
            Self::Flag | Self::Banner | Self::Pdf | Self::Gallery => ContentShape::Asset,
        }
    }

    /// Plain text columns, edited at creation time rather than through a session.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Name | Self::Region)
    }

    pub fn is_asset(&self) -> bool {
        self.shape() == ContentShape::Asset
    }

    /// Bucket keys of multi-group sections, empty for flat ones.
    pub fn group_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Transport => TRANSPORT_GROUPS,
            Self::Cuisine => CUISINE_GROUPS,
            _ => &[],
        }
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_keys().is_empty()
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
