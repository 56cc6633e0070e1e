/// Turn the `-1` error convention of libc calls into an [`std::io::Error`].
pub(crate) fn cerr<Int: Copy + TryInto<libc::c_long>>(res: Int) -> std::io::Result<Int> {
    match res.try_into() {
        Ok(-1) => Err(std::io::Error::last_os_error()),
        _ => Ok(res),
    }
}

#[cfg(test)]
mod tests {
    use super::cerr;

    #[test]
    fn minus_one_is_an_error() {
        assert!(cerr(-1i32).is_err());
        assert_eq!(cerr(0i32).unwrap(), 0);
        assert_eq!(cerr(42i64).unwrap(), 42);
    }
}
