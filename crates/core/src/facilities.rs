//! Nearby emergency facilities.
//!
//! There is no facility directory behind this yet; the list is fixed demo data ordered by
//! distance.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Facility {
    pub name: &'static str,
    pub address: &'static str,
    pub phone: &'static str,
    pub distance: &'static str,
    pub emergency_room: bool,
    pub trauma_center: bool,
    pub wait_time: &'static str,
}

const EMERGENCY_HOSPITALS: &[Facility] = &[
    Facility {
        name: "City General Hospital",
        address: "123 Main St, Downtown",
        phone: "+1-555-0123",
        distance: "0.8 miles",
        emergency_room: true,
        trauma_center: true,
        wait_time: "15 minutes",
    },
    Facility {
        name: "Regional Medical Center",
        address: "456 Oak Ave, Midtown",
        phone: "+1-555-0456",
        distance: "1.2 miles",
        emergency_room: true,
        trauma_center: false,
        wait_time: "25 minutes",
    },
    Facility {
        name: "University Hospital",
        address: "789 College Blvd, University District",
        phone: "+1-555-0789",
        distance: "2.1 miles",
        emergency_room: true,
        trauma_center: true,
        wait_time: "30 minutes",
    },
];

/// Hospitals with an emergency room, nearest first.
pub fn emergency_hospitals() -> &'static [Facility] {
    EMERGENCY_HOSPITALS
}

pub fn nearest_emergency_hospital() -> Option<&'static Facility> {
    EMERGENCY_HOSPITALS.iter().find(|f| f.emergency_room)
}

/// Hospitals that can also take trauma cases.
pub fn trauma_centers() -> impl Iterator<Item = &'static Facility> {
    EMERGENCY_HOSPITALS.iter().filter(|f| f.trauma_center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_listed_hospitals_have_emergency_rooms() {
        assert_eq!(emergency_hospitals().len(), 3);
        assert!(emergency_hospitals().iter().all(|f| f.emergency_room));
    }

    #[test]
    fn nearest_is_city_general() {
        let nearest = nearest_emergency_hospital().expect("a hospital");
        assert_eq!(nearest.name, "City General Hospital");
        assert_eq!(nearest.phone, "+1-555-0123");
    }

    #[test]
    fn regional_is_not_a_trauma_center() {
        let names: Vec<&str> = trauma_centers().map(|f| f.name).collect();
        assert_eq!(names, vec!["City General Hospital", "University Hospital"]);
    }
}
