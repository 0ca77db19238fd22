mod source_http;

// This file organizes the integration tests into a cohesive test suite.
// Each module tests a specific aspect of the application:
// - cache_mock: ScheduleService caching behaviour against an in-test cache
// - feed_pipeline: iCalendar bodies rendered end to end as lists and grids
// - source_http: ICS and Google Calendar sources against mock HTTP servers
