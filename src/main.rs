use woffle::{
    Woff1EncodeOptions, Woff2EncodeOptions, decode_woff1, decode_woff2, encode_woff1, encode_woff2,
};

fn main() {
    let mut args = std::env::args();
    let infile = args.nth(1).expect("usage: woffle <infile> <outfile>");
    let outfile = args.next().expect("usage: woffle <infile> <outfile>");

    println!("Reading from {infile}");
    let input = std::fs::read(&infile).unwrap();

    let output = if infile.ends_with(".woff") {
        println!("Decoding woff1");
        decode_woff1(&input).unwrap()
    } else if infile.ends_with(".woff2") {
        println!("Decoding woff2");
        decode_woff2(&input).unwrap()
    } else if outfile.ends_with(".woff") {
        println!("Encoding woff1");
        encode_woff1(&input, &Woff1EncodeOptions::default()).unwrap()
    } else {
        println!("Encoding woff2");
        encode_woff2(&input, &Woff2EncodeOptions::default()).unwrap()
    };

    println!("Writing to {outfile}");
    std::fs::write(outfile, output).unwrap();
}
