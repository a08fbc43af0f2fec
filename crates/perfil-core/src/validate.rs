//! Pure field validation for registration and profile edits.
//!
//! Deterministic given the same input and reference year; the reference year
//! comes from an injected [`Clock`](crate::clock::Clock), never from ambient
//! time.

use crate::{
  error::ValidationError,
  profile::{ProfileFields, ProfileValues, RegistrationFields},
};

/// Lower bound of the accepted graduation-year range.
pub const MIN_GRADUATION_YEAR: i32 = 1900;

/// Years past the reference year still accepted (students register before
/// graduating).
pub const GRADUATION_YEAR_SLACK: i32 = 5;

/// Validate a registration form: every field non-empty, year in range.
///
/// The password is checked for presence only; strength policy belongs to the
/// identity service.
pub fn validate_registration(
  fields: &RegistrationFields,
  current_year: i32,
) -> Result<ProfileValues, ValidationError> {
  require_non_empty("contrasena", &fields.contrasena)?;
  validate_profile_edit(&fields.profile, current_year)
}

/// Validate an edit form: same rules as registration, minus the password.
pub fn validate_profile_edit(
  fields: &ProfileFields,
  current_year: i32,
) -> Result<ProfileValues, ValidationError> {
  require_non_empty("nombre", &fields.nombre)?;
  require_non_empty("correo", &fields.correo)?;
  require_non_empty("titulo", &fields.titulo)?;
  require_non_empty("anioGraduacion", &fields.anio_graduacion)?;

  let anio = parse_year(&fields.anio_graduacion, current_year)?;

  Ok(ProfileValues {
    nombre:          fields.nombre.clone(),
    correo:          fields.correo.clone(),
    titulo:          fields.titulo.clone(),
    anio_graduacion: anio,
  })
}

fn require_non_empty(
  field: &'static str,
  value: &str,
) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::new(field, "must not be empty"));
  }
  Ok(())
}

fn parse_year(raw: &str, current_year: i32) -> Result<i32, ValidationError> {
  let max = current_year + GRADUATION_YEAR_SLACK;

  let anio: i32 = raw.trim().parse().map_err(|_| {
    ValidationError::new("anioGraduacion", "must be a whole number")
  })?;

  if anio < MIN_GRADUATION_YEAR || anio > max {
    return Err(ValidationError::new(
      "anioGraduacion",
      format!("must be between {MIN_GRADUATION_YEAR} and {max}"),
    ));
  }

  Ok(anio)
}

#[cfg(test)]
mod tests {
  use super::*;

  const YEAR: i32 = 2026;

  fn fields(anio: &str) -> ProfileFields {
    ProfileFields {
      nombre:          "Ana Morales".into(),
      correo:          "ana@example.com".into(),
      titulo:          "Ing. en Sistemas".into(),
      anio_graduacion: anio.into(),
    }
  }

  fn registration(anio: &str) -> RegistrationFields {
    RegistrationFields {
      contrasena: "pw123456".into(),
      profile:    fields(anio),
    }
  }

  #[test]
  fn accepts_a_complete_form() {
    let values = validate_profile_edit(&fields("2024"), YEAR).unwrap();
    assert_eq!(values.anio_graduacion, 2024);
    assert_eq!(values.nombre, "Ana Morales");
  }

  #[test]
  fn rejects_empty_and_whitespace_only_fields() {
    for (name, mutate) in [
      ("nombre", Box::new(|f: &mut ProfileFields| f.nombre = "  ".into())
        as Box<dyn Fn(&mut ProfileFields)>),
      ("correo", Box::new(|f| f.correo = String::new())),
      ("titulo", Box::new(|f| f.titulo = "\t".into())),
      ("anioGraduacion", Box::new(|f| f.anio_graduacion = String::new())),
    ] {
      let mut f = fields("2024");
      mutate(&mut f);
      let err = validate_profile_edit(&f, YEAR).unwrap_err();
      assert_eq!(err.field, name, "expected failure on {name}");
    }
  }

  #[test]
  fn year_range_boundaries() {
    // 1899 fails, 1900 passes.
    assert!(validate_profile_edit(&fields("1899"), YEAR).is_err());
    assert!(validate_profile_edit(&fields("1900"), YEAR).is_ok());

    // currentYear + 5 passes exactly, + 6 fails.
    assert!(validate_profile_edit(&fields("2031"), YEAR).is_ok());
    assert!(validate_profile_edit(&fields("2032"), YEAR).is_err());
  }

  #[test]
  fn year_must_parse_as_integer() {
    let err = validate_profile_edit(&fields("dos mil"), YEAR).unwrap_err();
    assert_eq!(err.field, "anioGraduacion");
  }

  #[test]
  fn registration_requires_a_password() {
    let mut r = registration("2024");
    r.contrasena = " ".into();
    let err = validate_registration(&r, YEAR).unwrap_err();
    assert_eq!(err.field, "contrasena");
  }

  #[test]
  fn registration_accepts_valid_input() {
    assert!(validate_registration(&registration("2024"), YEAR).is_ok());
  }

  #[test]
  fn deterministic_for_a_fixed_reference_year() {
    // The same input against a different reference year flips the verdict.
    assert!(validate_profile_edit(&fields("2031"), 2026).is_ok());
    assert!(validate_profile_edit(&fields("2031"), 2020).is_err());
  }
}
