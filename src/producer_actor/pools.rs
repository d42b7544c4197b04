//! Fixed pools the producer draws customers and items from.

use rand::Rng;

/// Name fragments. A customer id joins two independent draws with a space.
pub const CUSTOMERS: [&str; 78] = [
    "Yoda", "Obi-Wan", "Darth Vader", "Princess", "Leia", "Luke", "Skywalker", "R2D2", "Han",
    "Solo", "Chewbacca", "Jabba", "Pepe", "the Frog", "Blue", "Guy", "Alf", "Sad", "Banana",
    "Noid", "Ratchet", "Dorian", "Pavus", "Bella", "Goth", "Alduin", "Steve", "Chloe", "Price",
    "Cayde", "Garrus", "Vakarian", "Isaac", "Clarke", "Tom", "Nook", "Niko", "Bellic",
    "Kassandra", "Guybrush", "Threepwood", "Arthur", "Morgan", "Max", "Payne", "Sam", "Fisher",
    "Shepard", "Jim", "McCree", "Jonathan", "Irons", "Nathan", "Drake", "Deckard", "Cain",
    "Gordon", "Freeman", "Samus", "Aran", "Zelda", "Bonnie", "MacFarlane", "Rayne", "Sarah",
    "Kerrigan", "Marcus", "Fenix", "Kratos", "Duke", "Nukem", "Cloud", "Strife", "Geralt", "Lara",
    "Croft", "John", "Marston",
];

pub const ITEMS: [&str; 9] = [
    "Yoghurt",
    "Fruits",
    "Lightsaber",
    "Fluffy toy",
    "Dreamcatcher",
    "Candies",
    "Cigars",
    "Chicken nuggets",
    "French fries",
];

/// Uniform draw with replacement.
pub fn pick<'a, R: Rng>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

/// Two independent name draws joined into one customer id. Equal draws are kept as-is.
pub fn customer_name<R: Rng>(rng: &mut R) -> String {
    let first = pick(rng, &CUSTOMERS);
    let last = pick(rng, &CUSTOMERS);
    format!("{first} {last}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pool_sizes() {
        assert_eq!(CUSTOMERS.len(), 78);
        assert_eq!(ITEMS.len(), 9);
    }

    #[test]
    fn test_collision_keeps_both_tokens() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(customer_name(&mut rng), "Yoda Yoda");
        assert_eq!(pick(&mut rng, &ITEMS), "Yoghurt");
    }

    #[test]
    fn test_draws_stay_in_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let name = customer_name(&mut rng);
            assert!(CUSTOMERS.iter().any(|c| name.starts_with(c)));
            assert!(ITEMS.contains(&pick(&mut rng, &ITEMS)));
        }
    }
}
