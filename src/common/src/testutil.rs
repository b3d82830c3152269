use crate::{Attribute, DataType};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::env;
use std::path::PathBuf;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Integer attributes with the given names.
pub fn int_attributes(names: &[&str]) -> Vec<Attribute> {
    names
        .iter()
        .map(|n| Attribute::new(n.to_string(), DataType::Int))
        .collect()
}

/// Packs a row of i32s back to back, as a relation of int attributes stores it.
pub fn int_row_bytes(row: &[i32]) -> Vec<u8> {
    row.iter().flat_map(|i| i.to_le_bytes().to_vec()).collect()
}

pub fn get_random_byte_vec(n: usize) -> Vec<u8> {
    let random_bytes: Vec<u8> = (0..n).map(|_| rand::random::<u8>()).collect();
    random_bytes
}

pub fn gen_rand_string(n: usize) -> String {
    thread_rng().sample_iter(Alphanumeric).take(n).map(char::from).collect()
}

pub fn gen_random_dir() -> PathBuf {
    init();
    let mut dir = env::temp_dir();
    dir.push(String::from("crusty"));
    let rand_string = gen_rand_string(10);
    dir.push(rand_string);
    dir
}

pub fn get_random_vec_of_byte_vec(n: usize, min_size: usize, max_size: usize) -> Vec<Vec<u8>> {
    let mut res: Vec<Vec<u8>> = Vec::new();
    for _ in 0..n {
        let size = thread_rng().gen_range(min_size..max_size);
        res.push(get_random_byte_vec(size));
    }
    res
}

/// True if both lists hold the same byte vectors with the same multiplicities, in any order.
pub fn compare_unordered_byte_vecs(a: &[Vec<u8>], mut b: Vec<Vec<u8>>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    for x in a {
        match b.iter().position(|y| y[..] == x[..]) {
            None => return false,
            Some(idx) => {
                b.swap_remove(idx);
            }
        }
    }
    b.is_empty()
}
