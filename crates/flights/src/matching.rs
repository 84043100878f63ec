//! Pure flight matching.

use farestream_core::SearchRequest;

use crate::flight::Flight;

/// Flights matching the request's origin, destination, and departure date.
///
/// The dataset's `departure_time` is `date time`; only the date component is
/// compared, so a record with an unparseable timestamp simply never matches.
pub fn find_matching_flights(all: &[Flight], request: &SearchRequest) -> Vec<Flight> {
    all.iter()
        .filter(|flight| flight.from == request.from && flight.to == request.to)
        .filter(|flight| departure_date(flight) == Some(request.date.as_str()))
        .cloned()
        .collect()
}

fn departure_date(flight: &Flight) -> Option<&str> {
    flight.departure_time.split(' ').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight(id: &str, from: &str, to: &str, departure_time: &str) -> Flight {
        Flight {
            id: id.to_string(),
            airline: "Garuda Indonesia".to_string(),
            flight_number: format!("GA-{id}"),
            from: from.to_string(),
            to: to.to_string(),
            departure_time: departure_time.to_string(),
            arrival_time: "2025-07-10 11:45".to_string(),
            price: 950_000,
            currency: "IDR".to_string(),
            available: true,
        }
    }

    fn request(from: &str, to: &str, date: &str) -> SearchRequest {
        SearchRequest {
            from: from.to_string(),
            to: to.to_string(),
            date: date.to_string(),
            passengers: 2,
        }
    }

    #[test]
    fn matches_on_route_and_departure_date() {
        let all = vec![
            flight("1", "CGK", "DPS", "2025-07-10 08:30"),
            flight("2", "CGK", "DPS", "2025-07-11 08:30"),
            flight("3", "CGK", "SUB", "2025-07-10 08:30"),
            flight("4", "DPS", "CGK", "2025-07-10 08:30"),
            flight("5", "CGK", "DPS", "2025-07-10 19:05"),
        ];

        let matched = find_matching_flights(&all, &request("CGK", "DPS", "2025-07-10"));
        let ids: Vec<&str> = matched.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "5"]);
    }

    #[test]
    fn no_match_yields_empty() {
        let all = vec![flight("1", "CGK", "DPS", "2025-07-10 08:30")];
        assert!(find_matching_flights(&all, &request("CGK", "DPS", "2026-01-01")).is_empty());
        assert!(find_matching_flights(&[], &request("CGK", "DPS", "2025-07-10")).is_empty());
    }

    #[test]
    fn unparseable_departure_time_never_matches_by_accident() {
        let mut odd = flight("1", "CGK", "DPS", "");
        odd.departure_time = String::new();
        let matched = find_matching_flights(&[odd], &request("CGK", "DPS", "2025-07-10"));
        assert!(matched.is_empty());
    }
}
