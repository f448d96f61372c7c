//! Component errors into the core `AppError` hierarchy.

use skycheck_core::{AppError, GazetteerError, NetworkError, ReqwestErrorExt, WeatherError};
use skycheck_gazetteer::ValidationProblem;
use skycheck_weather::WeatherError as FetchError;

pub fn from_fetch_error(err: FetchError, location: &str) -> AppError {
    match err {
        FetchError::Transport(e) => AppError::Network(e.into_network_error()),
        FetchError::UpstreamStatus { status: 401, .. } => {
            AppError::Weather(WeatherError::InvalidApiKey)
        }
        FetchError::UpstreamStatus { status: 404, .. } => {
            AppError::Weather(WeatherError::LocationNotFound(location.to_string()))
        }
        FetchError::UpstreamStatus { status: 429, .. } => {
            AppError::Weather(WeatherError::RateLimited)
        }
        FetchError::UpstreamStatus { status, .. } if status >= 500 => {
            AppError::Weather(WeatherError::ServiceUnavailable)
        }
        FetchError::UpstreamStatus { status, body } => AppError::Weather(WeatherError::ApiError {
            status,
            message: body,
        }),
        FetchError::MalformedResponse(message) => {
            AppError::Network(NetworkError::InvalidResponse(message))
        }
    }
}

pub fn from_validation_problem(
    problem: ValidationProblem,
    city: &str,
    country: Option<&str>,
) -> AppError {
    match (problem, country) {
        (ValidationProblem::NoSuchCityInCountry, Some(country)) => {
            AppError::Gazetteer(GazetteerError::NoSuchCityInCountry {
                city: city.to_string(),
                country: country.to_string(),
            })
        }
        _ => AppError::Gazetteer(GazetteerError::NoSuchCity(city.to_string())),
    }
}
