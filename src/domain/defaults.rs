//! Fallback values substituted when a source record omits a field.

/// Every default the record mappers fall back to, in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefaults {
    pub post_category: String,
    pub post_image: String,
    pub post_published: bool,
    pub service_category: String,
    pub service_icon: String,
    pub service_image: String,
    pub service_price: String,
    pub testimonial_rating: u8,
    pub testimonial_service: String,
    pub testimonial_image: String,
    pub contact_name: String,
    pub contact_message: String,
    pub contact_source: String,
    pub contact_status: String,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            post_category: "General".to_string(),
            post_image: "/images/full-shot-roof.png".to_string(),
            post_published: false,
            service_category: "Services".to_string(),
            service_icon: "/images/roofing-1.svg".to_string(),
            service_image: "/images/full-shot-roof.png".to_string(),
            service_price: "Contact for Quote".to_string(),
            testimonial_rating: 5,
            testimonial_service: "General".to_string(),
            testimonial_image: "/images/Profile12-1.png".to_string(),
            contact_name: "Unknown".to_string(),
            contact_message: "No message provided".to_string(),
            contact_source: "Website".to_string(),
            contact_status: "New".to_string(),
        }
    }
}
