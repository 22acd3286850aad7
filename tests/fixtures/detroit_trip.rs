//! Small dense-urban Detroit trip in trip-file JSON shape.

pub const DETROIT_TRIP_JSON: &str = r#"{
  "config": {
    "mph": 28,
    "defaultDwellMin": 12,
    "seed": 2024,
    "runNote": "dense-urban-regression"
  },
  "days": [
    {
      "dayId": "D1",
      "start": { "id": "DU-START", "name": "Downtown Depot", "lat": 42.331, "lon": -83.045 },
      "end": { "id": "DU-END", "name": "Warehouse Return", "lat": 42.389, "lon": -83.02 },
      "window": { "start": "08:00", "end": "18:00" },
      "dayOfWeek": "Wed",
      "mustVisitIds": ["DU-001"],
      "breakWindow": { "start": "12:00", "end": "12:30" }
    },
    {
      "dayId": "D2",
      "start": { "id": "DU-START", "name": "Downtown Depot", "lat": 42.331, "lon": -83.045 },
      "end": { "id": "DU-START", "name": "Downtown Depot", "lat": 42.331, "lon": -83.045 },
      "window": { "start": "09:00", "end": "15:00" },
      "dayOfWeek": "Thu",
      "maxStops": 3
    }
  ],
  "stores": [
    { "id": "DU-001", "name": "Corktown Vintage", "lat": 42.3315, "lon": -83.0663, "dayId": "D1", "dwellMin": 15, "score": 3.1 },
    { "id": "DU-002", "name": "Midtown Thrift", "lat": 42.3510, "lon": -83.0610, "score": 4.2,
      "openHours": { "Wed": [["10:00", "18:00"]], "Thu": [["10:00", "18:00"]] } },
    { "id": "DU-003", "name": "Eastern Market Finds", "lat": 42.3467, "lon": -83.0410, "score": 2.4, "tags": ["market"] },
    { "id": "DU-004", "name": "New Center Records", "lat": 42.3690, "lon": -83.0730, "score": 3.8,
      "openHours": { "Wed": [], "Thu": [["09:00", "13:00"]] } },
    { "id": "DU-005", "name": "Hamtramck Antiques", "lat": 42.3980, "lon": -83.0500, "score": 4.9, "dayId": "D2" },
    { "id": "DU-006", "name": "Woodbridge Resale", "lat": 42.3550, "lon": -83.0780, "score": 1.7,
      "openHours": { "Wed": [["08:00", "11:00"], ["13:00", "17:00"]] } },
    { "id": "DU-007", "name": "Rivertown Relics", "lat": 42.3400, "lon": -83.0250, "dwellMin": 20, "score": 2.9 }
  ]
}"#;
